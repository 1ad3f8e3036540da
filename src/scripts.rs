//! Page-side scripts
//!
//! Every script evaluates to a JSON string so backends can hand back the
//! result text unchanged, whatever their object-transfer rules are.

use crate::{ClipRect, Error, Result, ScriptResult, StyleOverride};

/// Resolves once web fonts have finished loading.
pub const FONTS_READY: &str =
    "document.fonts.ready.then(function () { return JSON.stringify(document.fonts.status); })";

/// Document completeness plus the number of resources requested so far.
pub const NETWORK_PROBE: &str = r#"JSON.stringify({
    complete: document.readyState === 'complete',
    resources: performance.getEntriesByType('resource').length
})"#;

/// Scrollable extents of the document root.
pub const LAYOUT_PROBE: &str = r#"JSON.stringify({
    width: document.documentElement.scrollWidth,
    height: document.documentElement.scrollHeight
})"#;

fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::ScriptError(format!("Cannot encode script argument: {}", e)))
}

/// Set inline style properties on the first match; evaluates to whether
/// anything matched.
pub fn apply_style(style: &StyleOverride) -> Result<String> {
    let selector = js_literal(&style.selector)?;
    let properties = js_literal(&style.properties)?;
    Ok(format!(
        r#"(function () {{
    const el = document.querySelector({selector});
    if (!el) return JSON.stringify(false);
    for (const [name, value] of {properties}) {{
        el.style.setProperty(name, value);
    }}
    return JSON.stringify(true);
}})()"#
    ))
}

/// Bounding box of the first match in document coordinates, or `null`.
pub fn element_bounds(selector: &str) -> Result<String> {
    let selector = js_literal(selector)?;
    Ok(format!(
        r#"(function () {{
    const el = document.querySelector({selector});
    if (!el) return JSON.stringify(null);
    const r = el.getBoundingClientRect();
    return JSON.stringify({{
        x: r.left + window.scrollX,
        y: r.top + window.scrollY,
        width: r.width,
        height: r.height
    }});
}})()"#
    ))
}

pub fn parse_bounds(res: &ScriptResult) -> Result<Option<ClipRect>> {
    serde_json::from_value(res.json()?)
        .map_err(|e| Error::ScriptError(format!("Bad element bounds {:?}: {}", res.value, e)))
}
