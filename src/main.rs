//! Capture one A4 HTML document to PNG.
//!
//! Usage: a4-capture <input.html> <output.png> [--high-res]

use std::path::PathBuf;
use std::time::Duration;

use a4shot::capture::{capture_file, CaptureRequest};
use a4shot::cdp::CdpEngine;
use a4shot::{cli, CaptureTarget, ClipRect, EngineConfig, SettleStrategy, Viewport, A4_HEIGHT_PX, A4_WIDTH_PX};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "a4-capture", version, about = "Capture an A4 HTML document to PNG")]
struct Cli {
    /// HTML document to capture
    input: PathBuf,
    /// PNG file to write
    output: PathBuf,
    /// Render at 2x device scale
    #[arg(long)]
    high_res: bool,
    /// Viewport width in CSS pixels
    #[arg(long, default_value_t = A4_WIDTH_PX)]
    width: u32,
    /// Viewport height in CSS pixels
    #[arg(long, default_value_t = A4_HEIGHT_PX)]
    height: u32,
    /// Navigation timeout in milliseconds
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,
    /// Fixed delay after fonts are ready, in milliseconds
    #[arg(long, default_value_t = 1000)]
    settle_ms: u64,
    /// Wait for the layout to stop changing instead of a fixed delay
    #[arg(long)]
    settle_stable: bool,
    /// Capture this element's box instead of the page rectangle
    #[arg(long)]
    selector: Option<String>,
    /// Chrome/Chromium binary to launch
    #[arg(long)]
    chrome: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        let settle = if self.settle_stable {
            SettleStrategy::LayoutStable {
                interval: Duration::from_millis(100),
                stable_samples: 3,
                timeout: Duration::from_millis(self.settle_ms.max(1000).saturating_mul(5)),
            }
        } else {
            SettleStrategy::Fixed(Duration::from_millis(self.settle_ms))
        };
        EngineConfig {
            viewport: Viewport {
                width: self.width,
                height: self.height,
            },
            device_scale_factor: if self.high_res { 2.0 } else { 1.0 },
            timeout_ms: self.timeout_ms,
            settle,
            chrome_path: self.chrome.clone(),
            ..Default::default()
        }
    }

    fn request(&self) -> CaptureRequest {
        let target = match &self.selector {
            Some(selector) => CaptureTarget::element(selector.clone()),
            None => CaptureTarget::ClippedRegion(ClipRect::new(0.0, 0.0, self.width as f64, self.height as f64)),
        };
        CaptureRequest::new(&self.input, &self.output, target)
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let outcome = capture_file::<CdpEngine>(cli.engine_config(), &cli.request())?;
    println!("PNG captured: {}", outcome.destination.display());
    println!("Resolution: {} x {}px", outcome.width, outcome.height);
    Ok(())
}

fn main() {
    let cli: Cli = cli::parse_args();
    cli::init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Capture failed: {:#}", e);
        std::process::exit(1);
    }
}
