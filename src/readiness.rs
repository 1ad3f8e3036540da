//! Readiness tracking for loaded documents
//!
//! Both trackers are plain state machines fed with probe samples taken from
//! the page, so the polling loops in the backends stay trivial and the
//! convergence rules are testable without a browser.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::{Error, Result, ScriptResult};

/// One observation of the page's loading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSample {
    /// `document.readyState === "complete"`
    pub complete: bool,
    /// Number of resource timing entries seen so far
    pub resources: u64,
}

impl NetworkSample {
    pub fn from_script(res: &ScriptResult) -> Result<Self> {
        serde_json::from_value(res.json()?)
            .map_err(|e| Error::ScriptError(format!("Bad network probe {:?}: {}", res.value, e)))
    }
}

/// Decides when a page has gone network-idle: the document is complete and
/// no new resource has started for a full quiescence window.
#[derive(Debug)]
pub struct QuiescenceTracker {
    window: Duration,
    last_resources: Option<u64>,
    quiet_since: Option<Instant>,
}

impl QuiescenceTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_resources: None,
            quiet_since: None,
        }
    }

    /// Feed a sample taken at `now`; returns true once idle.
    pub fn observe(&mut self, sample: NetworkSample, now: Instant) -> bool {
        if !sample.complete {
            self.last_resources = None;
            self.quiet_since = None;
            return false;
        }
        match self.last_resources {
            Some(prev) if prev == sample.resources => {}
            _ => {
                self.last_resources = Some(sample.resources);
                self.quiet_since = Some(now);
            }
        }
        match self.quiet_since {
            Some(since) => now.duration_since(since) >= self.window,
            None => false,
        }
    }
}

/// Document extents used as a layout fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LayoutSample {
    pub width: f64,
    pub height: f64,
}

impl LayoutSample {
    pub fn from_script(res: &ScriptResult) -> Result<Self> {
        serde_json::from_value(res.json()?)
            .map_err(|e| Error::ScriptError(format!("Bad layout probe {:?}: {}", res.value, e)))
    }
}

/// Converges once `required` consecutive samples are identical.
#[derive(Debug)]
pub struct LayoutTracker {
    required: u32,
    last: Option<LayoutSample>,
    streak: u32,
}

impl LayoutTracker {
    pub fn new(required: u32) -> Self {
        Self {
            required: required.max(1),
            last: None,
            streak: 0,
        }
    }

    pub fn observe(&mut self, sample: LayoutSample) -> bool {
        if self.last == Some(sample) {
            self.streak += 1;
        } else {
            self.last = Some(sample);
            self.streak = 1;
        }
        self.streak >= self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(complete: bool, resources: u64) -> NetworkSample {
        NetworkSample { complete, resources }
    }

    #[test]
    fn idle_requires_full_window() {
        let t0 = Instant::now();
        let mut q = QuiescenceTracker::new(Duration::from_millis(500));
        assert!(!q.observe(sample(true, 3), t0));
        assert!(!q.observe(sample(true, 3), t0 + Duration::from_millis(499)));
        assert!(q.observe(sample(true, 3), t0 + Duration::from_millis(500)));
    }

    #[test]
    fn new_resource_restarts_window() {
        let t0 = Instant::now();
        let mut q = QuiescenceTracker::new(Duration::from_millis(500));
        q.observe(sample(true, 1), t0);
        assert!(!q.observe(sample(true, 2), t0 + Duration::from_millis(400)));
        assert!(!q.observe(sample(true, 2), t0 + Duration::from_millis(800)));
        assert!(q.observe(sample(true, 2), t0 + Duration::from_millis(900)));
    }

    #[test]
    fn incomplete_document_is_never_idle() {
        let t0 = Instant::now();
        let mut q = QuiescenceTracker::new(Duration::from_millis(10));
        assert!(!q.observe(sample(false, 0), t0));
        assert!(!q.observe(sample(false, 0), t0 + Duration::from_secs(5)));
        assert!(!q.observe(sample(true, 0), t0 + Duration::from_secs(6)));
        assert!(q.observe(sample(true, 0), t0 + Duration::from_secs(7)));
    }

    #[test]
    fn layout_needs_consecutive_matches() {
        let a = LayoutSample { width: 794.0, height: 1123.0 };
        let b = LayoutSample { width: 794.0, height: 1400.0 };
        let mut t = LayoutTracker::new(3);
        assert!(!t.observe(a));
        assert!(!t.observe(a));
        assert!(!t.observe(b));
        assert!(!t.observe(b));
        assert!(t.observe(b));
    }

    #[test]
    fn layout_single_sample_requirement() {
        let mut t = LayoutTracker::new(0);
        assert!(t.observe(LayoutSample { width: 1.0, height: 1.0 }));
    }

    #[test]
    fn network_sample_parses_probe_json() {
        let res = ScriptResult {
            value: r#"{"complete":true,"resources":4}"#.into(),
            is_error: false,
        };
        assert_eq!(NetworkSample::from_script(&res).unwrap(), sample(true, 4));
    }
}
