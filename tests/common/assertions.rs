//! Assertion macros over rendered exposition text.
//!
//! Series are matched by their full text form, e.g.
//! `bind_query_names_all{name="bitnebula.com"}`, so label order matters.

/// Value of `series` in `text`, if present.
pub fn series_value(text: &str, series: &str) -> Option<f64> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let (name, value) = line.rsplit_once(' ')?;
            (name == series).then(|| value.parse().ok()).flatten()
        })
}

/// Assert that `series` is rendered with `value`.
///
/// ```rust
/// assert_series!(text, "bind_query_names_total", 2);
/// ```
#[macro_export]
macro_rules! assert_series {
    ($text:expr, $series:expr, $value:expr) => {{
        let text: &str = &$text;
        let series: &str = $series;
        match $crate::common::series_value(text, series) {
            Some(actual) if actual == ($value as f64) => {}
            Some(actual) => panic!(
                "assert_series! failed:\n  series:   {}\n  expected: {}\n  actual:   {}",
                series, $value, actual
            ),
            None => panic!("assert_series! failed: {} not rendered.\n--- exposition ---\n{}", series, text),
        }
    }};
}

/// Assert that no series of the metric family `name` is rendered.
#[macro_export]
macro_rules! assert_no_series {
    ($text:expr, $name:expr) => {{
        let text: &str = &$text;
        let name: &str = $name;
        let found: Vec<&str> = text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .filter(|line| line.starts_with(name) && line[name.len()..].starts_with(['{', ' ']))
            .collect();
        assert!(found.is_empty(), "assert_no_series! failed: {} rendered as {:?}", name, found);
    }};
}
