//! Capture a week of A4 devotion pages to PNG.
//!
//! Usage: weekly-capture <week> [--base-dir <dir>] [--json]

use std::path::PathBuf;

use a4shot::batch::{run_batch, weekly_config, BatchEvent, BatchSummary, WeeklyLayout};
use a4shot::cdp::CdpEngine;
use a4shot::cli;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "weekly-capture", version, about = "Capture a week of A4 HTML pages to PNG")]
struct Cli {
    /// Week number, e.g. 6 for `week-6`
    week: u32,
    /// Root holding `weekly-devotion/` and `output/` (default: ~/Desktop/Ai works/Claude skills)
    #[arg(long)]
    base_dir: Option<PathBuf>,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
    /// Chrome/Chromium binary to launch
    #[arg(long)]
    chrome: Option<PathBuf>,
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_summary(summary: &BatchSummary) {
    println!("\nCapture complete (week-{})", summary.week);
    println!("├── Captured: {}", summary.success);
    println!("├── Skipped: {}", summary.skipped);
    println!("└── Saved to: {}", summary.output_dir.display());
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => WeeklyLayout::default_base_dir()?,
    };
    let layout = WeeklyLayout::new(base_dir, cli.week);
    let config = a4shot::EngineConfig {
        chrome_path: cli.chrome.clone(),
        ..weekly_config()
    };

    let quiet = cli.json;
    let summary = run_batch::<CdpEngine, _>(config, &layout, |event| {
        if quiet {
            return;
        }
        match event {
            BatchEvent::Captured { name, .. } => println!("  ✓ {}", name),
            BatchEvent::Skipped { source } => {
                let name = source.file_name().unwrap_or_default().to_string_lossy();
                println!("  skipped: {} (file missing)", name);
            }
        }
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_is_required() {
        let err = Cli::try_parse_from(["weekly-capture"]).unwrap_err();
        assert_eq!(cli::usage_exit_code(&err), 1);
    }

    #[test]
    fn base_dir_is_injectable() {
        let cli = Cli::try_parse_from(["weekly-capture", "6", "--base-dir", "/srv/devotion"]).unwrap();
        assert_eq!(cli.week, 6);
        assert_eq!(cli.base_dir, Some(PathBuf::from("/srv/devotion")));
    }
}
