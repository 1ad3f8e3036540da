//! Captures through a real headless Chrome

#![cfg(feature = "cdp")]

use a4shot::batch::{run_batch, weekly_config, Audience, Day, WeeklyLayout};
use a4shot::capture::{capture_file, png_dimensions, CaptureRequest};
use a4shot::cdp::CdpEngine;
use a4shot::{CaptureTarget, EngineConfig};

const A4_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<style>
  body { margin: 0; background: #fff; }
  .page { width: 210mm; height: 297mm; overflow: hidden; font-family: serif; }
  .tall { height: 1400px; background: #224; color: #fff; }
</style>
</head>
<body>
<div class="page"><h1>Wednesday prayer</h1><div class="tall">Overflowing content</div></div>
</body>
</html>"#;

fn write_doc(path: &std::path::Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, A4_PAGE).unwrap();
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_region_capture_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("prayer.html");
    write_doc(&src);

    for scale in [1.0, 2.0] {
        let dest = dir.path().join(format!("prayer@{}x.png", scale));
        let config = EngineConfig {
            device_scale_factor: scale,
            ..Default::default()
        };
        let outcome = capture_file::<CdpEngine>(config, &CaptureRequest::new(&src, &dest, CaptureTarget::a4_region()))
            .expect("capture");

        let png = std::fs::read(&dest).unwrap();
        assert!(png.len() > 100, "PNG data seems too small");
        assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
        let expected = ((794.0 * scale) as u32, (1123.0 * scale) as u32);
        assert_eq!(png_dimensions(&png).unwrap(), expected);
        assert_eq!((outcome.width, outcome.height), expected);
    }
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_missing_selector_still_captures() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("doc.html");
    write_doc(&src);
    let dest = dir.path().join("doc.png");

    let outcome = capture_file::<CdpEngine>(
        EngineConfig::default(),
        &CaptureRequest::new(&src, &dest, CaptureTarget::element("#does-not-exist")),
    )
    .expect("fallback capture");
    assert_eq!((outcome.width, outcome.height), (794, 1123));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_weekly_batch_unclamps_page() {
    let base = tempfile::tempdir().unwrap();
    let layout = WeeklyLayout::new(base.path(), 1);
    write_doc(&layout.source_for(Day::Mon, Audience::Youth));

    let summary = run_batch::<CdpEngine, _>(weekly_config(), &layout, |_| {}).expect("batch");
    assert_eq!(summary.success, 1);
    assert_eq!(summary.skipped, 9);

    let png = std::fs::read(layout.destination_for(Day::Mon, Audience::Youth)).unwrap();
    let (width, height) = png_dimensions(&png).unwrap();
    assert_eq!(width, 1588);
    assert!(height > 2246, "overflowing .page should extend past one A4 page, got {}", height);
}
