//! Chrome DevTools Protocol backend

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Page, Runtime};
use headless_chrome::{Browser, LaunchOptions};
use log::debug;

use crate::readiness::{NetworkSample, QuiescenceTracker};
use crate::{file_url, scripts, ClipRect, Engine, EngineConfig, Error, Result, ScriptResult};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// CDP-based engine (uses the `headless_chrome` crate)
///
/// Launches one headless Chrome with the viewport as window size and the
/// device-scale factor forced on the command line, and drives a single tab.
pub struct CdpEngine {
    browser: Browser,
    tab: Arc<Tab>,
    config: EngineConfig,
}

impl CdpEngine {
    fn launch_args(config: &EngineConfig) -> Vec<OsString> {
        let mut args = vec![OsString::from(format!(
            "--force-device-scale-factor={}",
            config.device_scale_factor
        ))];
        args.extend(config.extra_args.iter().map(OsString::from));
        args
    }

    fn network_sample(&self) -> Result<NetworkSample> {
        let res = self.eval(scripts::NETWORK_PROBE, false)?;
        NetworkSample::from_script(&res)
    }

    fn eval(&self, script: &str, await_promise: bool) -> Result<ScriptResult> {
        // `Tab::evaluate` drops `exceptionDetails`; go through the protocol
        // call so thrown scripts and rejected promises surface as errors.
        let evaluated = self
            .tab
            .call_method(Runtime::Evaluate {
                expression: script.to_string(),
                object_group: None,
                include_command_line_api: Some(false),
                silent: Some(false),
                context_id: None,
                return_by_value: Some(false),
                generate_preview: Some(true),
                user_gesture: Some(false),
                await_promise: Some(await_promise),
                throw_on_side_effect: None,
                timeout: None,
                disable_breaks: None,
                repl_mode: None,
                allow_unsafe_eval_blocked_by_csp: None,
                unique_context_id: None,
                serialization_options: None,
            })
            .map_err(|e| Error::ScriptError(format!("Evaluation failed: {}", e)))?;

        let exception = evaluated.exception_details.map(|details| {
            details
                .exception
                .and_then(|ex| ex.description)
                .unwrap_or(details.text)
        });
        Ok(script_result(evaluated.result.value, exception))
    }
}

/// Map an evaluation outcome to a [`ScriptResult`]. Scripts return JSON
/// text, so strings pass through unquoted.
fn script_result(value: Option<serde_json::Value>, exception: Option<String>) -> ScriptResult {
    if let Some(text) = exception {
        return ScriptResult { value: text, is_error: true };
    }
    let value = match value {
        Some(serde_json::Value::String(s)) => s,
        Some(v) => v.to_string(),
        None => "null".to_string(),
    };
    ScriptResult { value, is_error: false }
}

impl Engine for CdpEngine {
    fn new(config: EngineConfig) -> Result<Self>
    where
        Self: Sized,
    {
        config.validate()?;

        let args = Self::launch_args(&config);
        let arg_refs: Vec<&OsStr> = args.iter().map(|a| a.as_os_str()).collect();

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.chrome_path.clone())
            .args(arg_refs)
            .idle_browser_timeout(config.timeout().max(Duration::from_secs(30)).saturating_mul(2))
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(config.timeout());

        debug!(
            "browser launched: {}x{} @{}x",
            config.viewport.width, config.viewport.height, config.device_scale_factor
        );

        Ok(Self { browser, tab, config })
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let url = file_url(path)?;
        let timeout = self.config.timeout();
        let timed_out = || Error::NavigationTimeout {
            url: url.clone(),
            timeout_ms: self.config.timeout_ms,
        };
        let started = Instant::now();

        self.tab
            .navigate_to(&url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        if let Err(e) = self.tab.wait_until_navigated() {
            if started.elapsed() >= timeout {
                return Err(timed_out());
            }
            return Err(Error::LoadError(format!("Wait for navigation failed: {}", e)));
        }

        let mut tracker = QuiescenceTracker::new(Duration::from_millis(self.config.quiescence_ms));
        loop {
            let sample = self.network_sample()?;
            let now = Instant::now();
            if tracker.observe(sample, now) {
                debug!("{} network idle after {:?} ({} resources)", url, started.elapsed(), sample.resources);
                return Ok(());
            }
            if now.duration_since(started) >= timeout {
                return Err(timed_out());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    fn evaluate_in_page(&mut self, script: &str) -> Result<ScriptResult> {
        self.eval(script, true)
    }

    fn render_png(&mut self, clip: Option<ClipRect>) -> Result<Vec<u8>> {
        let shot = self
            .tab
            .call_method(Page::CaptureScreenshot {
                format: Some(Page::CaptureScreenshotFormatOption::Png),
                quality: None,
                clip: clip.map(|c| Page::Viewport {
                    x: c.x,
                    y: c.y,
                    width: c.width,
                    height: c.height,
                    scale: 1.0,
                }),
                from_surface: Some(true),
                capture_beyond_viewport: Some(clip.is_some()),
                optimize_for_speed: None,
            })
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;

        base64::engine::general_purpose::STANDARD
            .decode(shot.data)
            .map_err(|e| Error::RenderError(format!("Screenshot data is not base64: {}", e)))
    }

    fn close(self) -> Result<()> {
        // Drop the tab before the browser so the child process exits promptly.
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
