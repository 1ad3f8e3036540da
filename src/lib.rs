//! a4shot
//!
//! Captures pre-rendered, fixed-size HTML documents (A4 pages) to PNG by
//! driving a headless browser. The library exposes a backend-agnostic
//! [`Engine`] trait, a headless Chrome backend, and the two capture routines
//! used by the binaries: a single-file capture and a weekly batch.
//!
//! # Features
//!
//! - **CDP Backend** (default): Uses Chrome DevTools Protocol via headless Chrome
//! - **Explicit targets**: whole viewport, a clipped region, or an element's box
//! - **Deterministic readiness**: network quiescence, font loading, then a settle step
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cdp")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use a4shot::capture::{capture_file, CaptureRequest};
//! use a4shot::{cdp::CdpEngine, CaptureTarget, EngineConfig};
//!
//! let config = EngineConfig {
//!     device_scale_factor: 2.0,
//!     ..Default::default()
//! };
//! let request = CaptureRequest::new("page.html", "page.png", CaptureTarget::a4_region());
//! let outcome = capture_file::<CdpEngine>(config, &request)?;
//! println!("{}x{}", outcome.width, outcome.height);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "cdp"))]
//! # fn main() {}
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod batch;
pub mod capture;
pub mod cli;
pub mod readiness;
pub mod scripts;

use readiness::{LayoutSample, LayoutTracker};

/// A4 width in CSS pixels at 96 DPI (210mm)
pub const A4_WIDTH_PX: u32 = 794;
/// A4 height in CSS pixels at 96 DPI (297mm)
pub const A4_HEIGHT_PX: u32 = 1123;

/// Upper bound for navigation and settle budgets (ten minutes)
pub const MAX_WAIT_MS: u64 = 600_000;

/// Configuration for a capture session
///
/// The defaults describe a single A4 page at 1x scale with the timings the
/// single-file tool has always used: a 30 second navigation budget, a 500ms
/// network quiescence window and a fixed one second settle delay.
///
/// # Examples
///
/// ```
/// let cfg = a4shot::EngineConfig::default();
/// assert_eq!(cfg.viewport.width, 794);
/// assert_eq!(cfg.device_size(), (794, 1123));
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rendering surface in CSS pixels
    pub viewport: Viewport,
    /// Device-scale factor; output raster is `viewport * scale`
    pub device_scale_factor: f64,
    /// Navigation budget in milliseconds, including network quiescence
    pub timeout_ms: u64,
    /// Trailing interval with no new resource loads that counts as idle
    pub quiescence_ms: u64,
    /// Post-font-readiness settle step
    pub settle: SettleStrategy,
    /// Run the browser without a window
    pub headless: bool,
    /// Keep Chrome's process sandbox enabled
    pub sandbox: bool,
    /// Additional command-line flags passed to the browser
    pub extra_args: Vec<String>,
    /// Explicit browser binary; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            device_scale_factor: 1.0,
            timeout_ms: 30000,
            quiescence_ms: 500,
            settle: SettleStrategy::default(),
            headless: true,
            sandbox: false,
            extra_args: vec![
                "--disable-setuid-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--font-render-hinting=none".to_string(),
            ],
            chrome_path: None,
        }
    }
}

impl EngineConfig {
    /// Reject configurations that cannot produce a raster.
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if !(self.device_scale_factor.is_finite() && self.device_scale_factor > 0.0) {
            return Err(Error::ConfigError(format!(
                "device scale factor must be positive, got {}",
                self.device_scale_factor
            )));
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_WAIT_MS {
            return Err(Error::ConfigError(format!(
                "navigation timeout must be within 1..={}ms, got {}",
                MAX_WAIT_MS, self.timeout_ms
            )));
        }
        let settle_budget = match &self.settle {
            SettleStrategy::Fixed(delay) => *delay,
            SettleStrategy::LayoutStable { timeout, .. } => *timeout,
        };
        if settle_budget > Duration::from_millis(MAX_WAIT_MS) {
            return Err(Error::ConfigError(format!(
                "settle budget must be at most {}ms, got {:?}",
                MAX_WAIT_MS, settle_budget
            )));
        }
        Ok(())
    }

    /// Expected raster size of a whole-viewport capture in device pixels.
    pub fn device_size(&self) -> (u32, u32) {
        self.viewport.device_size(self.device_scale_factor)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: A4_WIDTH_PX,
            height: A4_HEIGHT_PX,
        }
    }
}

impl Viewport {
    pub fn device_size(&self, scale: f64) -> (u32, u32) {
        (
            (self.width as f64 * scale).round() as u32,
            (self.height as f64 * scale).round() as u32,
        )
    }
}

/// A rectangle in document CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ClipRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// A zero-area box cannot be captured (e.g. `display: none`).
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// What part of the rendered document ends up in the PNG.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureTarget {
    /// The configured viewport as rendered
    WholeViewport,
    /// An explicit rectangle in document coordinates
    ClippedRegion(ClipRect),
    /// The bounding box of the first element matching `selector`, including
    /// any part of it below the fold. Falls back to [`CaptureTarget::WholeViewport`]
    /// when nothing matches.
    ElementBoundingBox { selector: String },
}

impl CaptureTarget {
    /// The A4 page rectangle anchored at the document origin.
    pub fn a4_region() -> Self {
        CaptureTarget::ClippedRegion(ClipRect::new(
            0.0,
            0.0,
            A4_WIDTH_PX as f64,
            A4_HEIGHT_PX as f64,
        ))
    }

    pub fn element(selector: impl Into<String>) -> Self {
        CaptureTarget::ElementBoundingBox {
            selector: selector.into(),
        }
    }
}

/// Inline style properties applied to one element before capture.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleOverride {
    pub selector: String,
    pub properties: Vec<(String, String)>,
}

impl StyleOverride {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            properties: Vec::new(),
        }
    }

    pub fn set(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((property.into(), value.into()));
        self
    }

    /// Lift the fixed height of a `.page` container so overflowing content
    /// is not clipped, while keeping at least one A4 page of height.
    pub fn unclamp_page_height(selector: impl Into<String>) -> Self {
        Self::new(selector)
            .set("height", "auto")
            .set("min-height", "297mm")
    }
}

/// How to absorb late layout and font-swap reflow after fonts report ready.
#[derive(Debug, Clone, PartialEq)]
pub enum SettleStrategy {
    /// Unconditional sleep
    Fixed(Duration),
    /// Poll document extents until `stable_samples` consecutive samples
    /// agree. Gives up with a warning after `timeout`.
    LayoutStable {
        interval: Duration,
        stable_samples: u32,
        timeout: Duration,
    },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        SettleStrategy::Fixed(Duration::from_millis(1000))
    }
}

/// Result of JavaScript execution
///
/// `value` is the JSON serialization of the evaluated value.
#[derive(Debug, Clone)]
pub struct ScriptResult {
    /// Serialized result value
    pub value: String,
    /// Whether the script threw an error
    pub is_error: bool,
}

impl ScriptResult {
    pub fn json(&self) -> Result<serde_json::Value> {
        if self.is_error {
            return Err(Error::ScriptError(self.value.clone()));
        }
        serde_json::from_str(&self.value)
            .map_err(|e| Error::ScriptError(format!("Unparseable script result {:?}: {}", self.value, e)))
    }
}

/// Core trait for rendering backends
///
/// A backend owns one browser session with one page. Only navigation,
/// evaluation and rasterization are backend-specific; font readiness,
/// settling, style overrides and element lookup are expressed as page
/// scripts on top of [`Engine::evaluate_in_page`].
pub trait Engine {
    /// Launch a session configured with the given rendering surface
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized;

    /// Configuration the session was created with
    fn config(&self) -> &EngineConfig;

    /// Navigate to a local document and block until the network is quiet.
    ///
    /// Exceeding the configured timeout is [`Error::NavigationTimeout`].
    fn load_file(&mut self, path: &Path) -> Result<()>;

    /// Evaluate JavaScript in the page's global context, awaiting promises
    fn evaluate_in_page(&mut self, script: &str) -> Result<ScriptResult>;

    /// Rasterize the page to PNG, optionally clipped to a document rectangle
    fn render_png(&mut self, clip: Option<ClipRect>) -> Result<Vec<u8>>;

    /// Close the session and terminate the browser
    fn close(self) -> Result<()>;

    // --- Page-script helpers (default implementations) ---

    /// Block until `document.fonts.ready` resolves.
    fn wait_for_fonts(&mut self) -> Result<()> {
        let res = self.evaluate_in_page(scripts::FONTS_READY)?;
        if res.is_error {
            return Err(Error::ScriptError(format!("Font readiness failed: {}", res.value)));
        }
        debug!("fonts ready: {}", res.value);
        Ok(())
    }

    /// Run the settle step after fonts are ready.
    fn settle(&mut self, strategy: &SettleStrategy) -> Result<()> {
        match strategy {
            SettleStrategy::Fixed(delay) => {
                std::thread::sleep(*delay);
                Ok(())
            }
            SettleStrategy::LayoutStable {
                interval,
                stable_samples,
                timeout,
            } => {
                let started = Instant::now();
                let mut tracker = LayoutTracker::new(*stable_samples);
                loop {
                    let sample = LayoutSample::from_script(&self.evaluate_in_page(scripts::LAYOUT_PROBE)?)?;
                    if tracker.observe(sample) {
                        debug!("layout stable after {:?}", started.elapsed());
                        return Ok(());
                    }
                    if started.elapsed() >= *timeout {
                        warn!("layout still changing after {:?}; capturing anyway", timeout);
                        return Ok(());
                    }
                    std::thread::sleep(*interval);
                }
            }
        }
    }

    /// Apply inline style properties to the first element matching the
    /// override's selector. Returns whether an element matched.
    fn apply_style(&mut self, style: &StyleOverride) -> Result<bool> {
        let script = scripts::apply_style(style)?;
        let matched = self.evaluate_in_page(&script)?.json()?;
        Ok(matched.as_bool().unwrap_or(false))
    }

    /// Bounding box of the first element matching `selector`, in document
    /// coordinates, or `None` when nothing matches.
    fn element_bounds(&mut self, selector: &str) -> Result<Option<ClipRect>> {
        let script = scripts::element_bounds(selector)?;
        scripts::parse_bounds(&self.evaluate_in_page(&script)?)
    }
}

/// `file://` URL for a local document.
pub fn file_url(path: &Path) -> Result<String> {
    url::Url::from_file_path(path)
        .map(|u| u.to_string())
        .map_err(|_| Error::LoadError(format!("Cannot build file URL for {}", path.display())))
}
