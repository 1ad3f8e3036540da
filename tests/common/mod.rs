//! In-memory engine for driving the capture routines without a browser.
//!
//! State lives in a thread local so each test (one thread per test) sees
//! only its own launches and page loads.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use a4shot::{file_url, scripts, ClipRect, Engine, EngineConfig, Error, Result, ScriptResult};

#[derive(Debug, Default)]
pub struct FakeState {
    pub launched: usize,
    pub closed: usize,
    pub loaded: Vec<PathBuf>,
    pub styled: usize,
    /// Box of the element every selector resolves to; `None` = no match
    pub element: Option<ClipRect>,
    /// File name whose navigation never goes idle
    pub hang_on: Option<String>,
    /// Bounds lookups throw like an invalid selector would
    pub bounds_throw: bool,
    /// Document height added per layout sample; non-zero never settles
    pub layout_growth: f64,
    pub layout_samples: usize,
}

thread_local! {
    static STATE: RefCell<FakeState> = RefCell::new(FakeState::default());
}

pub fn reset() {
    STATE.with(|s| *s.borrow_mut() = FakeState::default());
}

pub fn with_state<R>(f: impl FnOnce(&mut FakeState) -> R) -> R {
    STATE.with(|s| f(&mut s.borrow_mut()))
}

pub struct FakeEngine {
    config: EngineConfig,
}

impl Engine for FakeEngine {
    fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        with_state(|s| s.launched += 1);
        Ok(Self { config })
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let url = file_url(path)?;
        if !path.is_file() {
            return Err(Error::LoadError(format!("net::ERR_FILE_NOT_FOUND {}", url)));
        }
        let hang = with_state(|s| {
            s.loaded.push(path.to_path_buf());
            s.hang_on.as_deref() == path.file_name().and_then(|n| n.to_str())
        });
        if hang {
            return Err(Error::NavigationTimeout {
                url,
                timeout_ms: self.config.timeout_ms,
            });
        }
        Ok(())
    }

    fn evaluate_in_page(&mut self, script: &str) -> Result<ScriptResult> {
        let (element, bounds_throw) = with_state(|s| (s.element, s.bounds_throw));
        let value = if script == scripts::FONTS_READY {
            "\"loaded\"".to_string()
        } else if script == scripts::LAYOUT_PROBE {
            let height = with_state(|s| {
                s.layout_samples += 1;
                1123.0 + s.layout_growth * s.layout_samples as f64
            });
            format!(r#"{{"width":794,"height":{}}}"#, height)
        } else if script.contains("getBoundingClientRect") && bounds_throw {
            return Ok(ScriptResult {
                value: "SyntaxError: 'div[' is not a valid selector.".to_string(),
                is_error: true,
            });
        } else if script.contains("setProperty") {
            if element.is_some() {
                with_state(|s| s.styled += 1);
            }
            element.is_some().to_string()
        } else if script.contains("getBoundingClientRect") {
            serde_json::to_string(&element).unwrap()
        } else {
            return Err(Error::ScriptError(format!("unexpected script: {}", script)));
        };
        Ok(ScriptResult { value, is_error: false })
    }

    fn render_png(&mut self, clip: Option<ClipRect>) -> Result<Vec<u8>> {
        let (w, h) = match clip {
            Some(c) => (c.width, c.height),
            None => (self.config.viewport.width as f64, self.config.viewport.height as f64),
        };
        let scale = self.config.device_scale_factor;
        Ok(solid_png((w * scale).round() as u32, (h * scale).round() as u32))
    }

    fn close(self) -> Result<()> {
        with_state(|s| s.closed += 1);
        Ok(())
    }
}

pub fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().expect("png header");
        writer
            .write_image_data(&vec![255u8; (width * height * 4) as usize])
            .expect("png data");
    }
    buf
}

pub fn write_page(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(
        path,
        r#"<!DOCTYPE html><html><body><div class="page">Hello</div></body></html>"#,
    )
    .unwrap();
}
