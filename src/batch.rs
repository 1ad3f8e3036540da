//! Weekly batch capture
//!
//! A week's documents live in one directory as `{day}-{audience}-a4.html`
//! for Monday to Friday and two audiences. Every document present is
//! captured through a single browser session; absent ones are skipped.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::capture::{capture_page, persist, CaptureOutcome, Session};
use crate::{CaptureTarget, Engine, EngineConfig, Error, Result, StyleOverride};

/// Selector of the page container in the weekly documents
pub const PAGE_SELECTOR: &str = ".page";

/// Navigation budget per weekly document in milliseconds
pub const WEEKLY_TIMEOUT_MS: u64 = 15000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
}

impl Day {
    pub const ALL: [Day; 5] = [Day::Mon, Day::Tue, Day::Wed, Day::Thu, Day::Fri];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Mon => "mon",
            Day::Tue => "tue",
            Day::Wed => "wed",
            Day::Thu => "thu",
            Day::Fri => "fri",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Adult,
    Youth,
}

impl Audience {
    pub const ALL: [Audience; 2] = [Audience::Adult, Audience::Youth];

    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Adult => "adult",
            Audience::Youth => "youth",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every (day, audience) pair in capture order.
pub fn schedule() -> impl Iterator<Item = (Day, Audience)> {
    Day::ALL
        .into_iter()
        .flat_map(|day| Audience::ALL.into_iter().map(move |audience| (day, audience)))
}

/// Directory conventions for one week, rooted at an explicit base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyLayout {
    pub base_dir: PathBuf,
    pub week: u32,
}

impl WeeklyLayout {
    pub fn new(base_dir: impl Into<PathBuf>, week: u32) -> Self {
        Self {
            base_dir: base_dir.into(),
            week,
        }
    }

    /// Conventional base directory under the user's home.
    pub fn default_base_dir() -> Result<PathBuf> {
        let home = std::env::var_os("HOME")
            .ok_or_else(|| Error::ConfigError("HOME is not set; pass --base-dir".into()))?;
        Ok(PathBuf::from(home).join("Desktop").join("Ai works").join("Claude skills"))
    }

    pub fn input_dir(&self) -> PathBuf {
        self.base_dir
            .join("weekly-devotion")
            .join("output")
            .join(format!("week-{}", self.week))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_dir
            .join("output")
            .join(format!("week{}_image", self.week))
            .join("captured")
    }

    pub fn source_name(day: Day, audience: Audience) -> String {
        format!("{}-{}-a4.html", day, audience)
    }

    pub fn output_name(day: Day, audience: Audience) -> String {
        format!("{}-{}.png", day, audience)
    }

    pub fn source_for(&self, day: Day, audience: Audience) -> PathBuf {
        self.input_dir().join(Self::source_name(day, audience))
    }

    pub fn destination_for(&self, day: Day, audience: Audience) -> PathBuf {
        self.output_dir().join(Self::output_name(day, audience))
    }
}

/// Session configuration for weekly documents: A4 at 2x, 15s navigation.
pub fn weekly_config() -> EngineConfig {
    EngineConfig {
        device_scale_factor: 2.0,
        timeout_ms: WEEKLY_TIMEOUT_MS,
        ..Default::default()
    }
}

/// Progress notifications emitted while the batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Captured { name: &'a str, outcome: &'a CaptureOutcome },
    Skipped { source: &'a Path },
}

/// End-of-run report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub week: u32,
    pub success: usize,
    pub skipped: usize,
    pub captured: Vec<String>,
    pub skipped_files: Vec<String>,
    pub output_dir: PathBuf,
}

/// Capture every document present for the week.
///
/// Fails with [`Error::MissingInputDir`] before launching a browser when the
/// week's directory is absent. Missing documents are skipped; any other
/// failure aborts the run. The session is released on every exit path.
pub fn run_batch<E, F>(config: EngineConfig, layout: &WeeklyLayout, mut on_event: F) -> Result<BatchSummary>
where
    E: Engine,
    F: FnMut(BatchEvent<'_>),
{
    config.validate()?;
    let input_dir = layout.input_dir();
    if !input_dir.is_dir() {
        return Err(Error::MissingInputDir(input_dir));
    }
    let output_dir = layout.output_dir();
    std::fs::create_dir_all(&output_dir)?;

    let target = CaptureTarget::element(PAGE_SELECTOR);
    let style = StyleOverride::unclamp_page_height(PAGE_SELECTOR);
    let mut summary = BatchSummary {
        week: layout.week,
        output_dir,
        ..Default::default()
    };

    let mut session = Session::<E>::open(config)?;
    for (day, audience) in schedule() {
        let source = layout.source_for(day, audience);
        if !source.is_file() {
            debug!("skipping {}: not found", source.display());
            on_event(BatchEvent::Skipped { source: &source });
            summary.skipped += 1;
            summary.skipped_files.push(WeeklyLayout::source_name(day, audience));
            continue;
        }

        let png_data = capture_page(session.engine()?, &source, &target, Some(&style))?;
        let name = WeeklyLayout::output_name(day, audience);
        let outcome = persist(&layout.destination_for(day, audience), &png_data)?;
        on_event(BatchEvent::Captured {
            name: &name,
            outcome: &outcome,
        });
        summary.success += 1;
        summary.captured.push(name);
    }
    session.close()?;

    info!(
        "week {}: {} captured, {} skipped",
        summary.week, summary.success, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_covers_cross_product_in_order() {
        let pairs: Vec<_> = schedule().collect();
        assert_eq!(pairs.len(), 10);
        assert_eq!(pairs[0], (Day::Mon, Audience::Adult));
        assert_eq!(pairs[1], (Day::Mon, Audience::Youth));
        assert_eq!(pairs[9], (Day::Fri, Audience::Youth));
    }

    #[test]
    fn layout_paths() {
        let layout = WeeklyLayout::new("/base", 6);
        assert_eq!(layout.input_dir(), PathBuf::from("/base/weekly-devotion/output/week-6"));
        assert_eq!(layout.output_dir(), PathBuf::from("/base/output/week6_image/captured"));
        assert_eq!(
            layout.source_for(Day::Wed, Audience::Youth),
            PathBuf::from("/base/weekly-devotion/output/week-6/wed-youth-a4.html")
        );
        assert_eq!(
            layout.destination_for(Day::Wed, Audience::Youth),
            PathBuf::from("/base/output/week6_image/captured/wed-youth.png")
        );
    }

    #[test]
    fn weekly_config_is_a4_at_double_scale() {
        let cfg = weekly_config();
        assert_eq!(cfg.device_size(), (1588, 2246));
        assert_eq!(cfg.timeout_ms, 15000);
    }

    #[test]
    fn summary_serializes() {
        let summary = BatchSummary {
            week: 6,
            success: 3,
            skipped: 7,
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["success"], 3);
        assert_eq!(json["skipped"], 7);
    }
}
