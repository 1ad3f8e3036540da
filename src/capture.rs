//! Rendering a document to a PNG file
//!
//! [`capture_file`] is the whole single-file procedure: resolve paths, check
//! the source, acquire a browser, load, wait, capture, write, release.
//! [`capture_page`] and [`persist`] are the pieces the batch run reuses with
//! a long-lived session.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{CaptureTarget, ClipRect, Engine, EngineConfig, Error, Result, StyleOverride};

/// One document to capture.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub target: CaptureTarget,
    /// Applied after the settle step, before the target is measured
    pub style: Option<StyleOverride>,
}

impl CaptureRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, target: CaptureTarget) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            target,
            style: None,
        }
    }

    pub fn with_style(mut self, style: StyleOverride) -> Self {
        self.style = Some(style);
        self
    }
}

/// A PNG that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub destination: PathBuf,
    pub bytes: usize,
    pub width: u32,
    pub height: u32,
}

/// Scoped ownership of a browser session.
///
/// The engine is closed by [`Session::close`] or, on any early return or
/// panic, when the guard is dropped.
pub struct Session<E: Engine> {
    engine: Option<E>,
}

impl<E: Engine> Session<E> {
    pub fn open(config: EngineConfig) -> Result<Self> {
        Ok(Self::from_engine(E::new(config)?))
    }

    pub fn from_engine(engine: E) -> Self {
        Self { engine: Some(engine) }
    }

    pub fn engine(&mut self) -> Result<&mut E> {
        self.engine
            .as_mut()
            .ok_or_else(|| Error::Other("browser session already closed".into()))
    }

    pub fn close(mut self) -> Result<()> {
        match self.engine.take() {
            Some(engine) => engine.close(),
            None => Ok(()),
        }
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            debug!("releasing browser session");
            if let Err(e) = engine.close() {
                warn!("Failed to close browser session: {}", e);
            }
        }
    }
}

/// Make `path` absolute against the current directory.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Absolute source and destination; the source must exist.
pub fn resolve_paths(source: &Path, destination: &Path) -> Result<(PathBuf, PathBuf)> {
    let source = absolutize(source)?;
    if !source.is_file() {
        return Err(Error::MissingInput(source));
    }
    Ok((source, absolutize(destination)?))
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Load, wait for readiness, optionally restyle, then rasterize the target.
pub fn capture_page<E: Engine>(
    engine: &mut E,
    source: &Path,
    target: &CaptureTarget,
    style: Option<&StyleOverride>,
) -> Result<Vec<u8>> {
    engine.load_file(source)?;
    engine.wait_for_fonts()?;
    let settle = engine.config().settle.clone();
    engine.settle(&settle)?;

    if let Some(style) = style {
        if !engine.apply_style(style)? {
            debug!("style override: no element matches {:?}", style.selector);
        }
    }

    let clip = resolve_clip(engine, target)?;
    engine.render_png(clip)
}

fn resolve_clip<E: Engine>(engine: &mut E, target: &CaptureTarget) -> Result<Option<ClipRect>> {
    match target {
        CaptureTarget::WholeViewport => Ok(None),
        CaptureTarget::ClippedRegion(rect) => Ok(Some(*rect)),
        CaptureTarget::ElementBoundingBox { selector } => match engine.element_bounds(selector)? {
            Some(rect) if !rect.is_empty() => Ok(Some(rect)),
            Some(_) => {
                warn!("{:?} has an empty box; capturing the viewport instead", selector);
                Ok(None)
            }
            None => {
                warn!("{:?} not found; capturing the viewport instead", selector);
                Ok(None)
            }
        },
    }
}

/// Write PNG bytes to `destination` and report what was written.
pub fn persist(destination: &Path, png_data: &[u8]) -> Result<CaptureOutcome> {
    let (width, height) = png_dimensions(png_data)?;
    fs::write(destination, png_data)?;
    info!("wrote {} ({}x{}, {} bytes)", destination.display(), width, height, png_data.len());
    Ok(CaptureOutcome {
        destination: destination.to_path_buf(),
        bytes: png_data.len(),
        width,
        height,
    })
}

/// Pixel dimensions from a PNG header.
pub fn png_dimensions(png_data: &[u8]) -> Result<(u32, u32)> {
    let reader = png::Decoder::new(png_data)
        .read_info()
        .map_err(|e| Error::RenderError(format!("Captured data is not a PNG: {}", e)))?;
    let info = reader.info();
    Ok((info.width, info.height))
}

/// Capture one document to one PNG file with a dedicated browser session.
///
/// Fails with [`Error::MissingInput`] before any browser is launched when
/// the source does not exist. The session is released on every path.
pub fn capture_file<E: Engine>(config: EngineConfig, request: &CaptureRequest) -> Result<CaptureOutcome> {
    config.validate()?;
    let (source, destination) = resolve_paths(&request.source, &request.destination)?;
    ensure_parent_dir(&destination)?;

    let mut session = Session::<E>::open(config)?;
    let png_data = capture_page(session.engine()?, &source, &request.target, request.style.as_ref())?;
    let outcome = persist(&destination, &png_data)?;
    session.close()?;
    Ok(outcome)
}
