//! # License Themes
//!
//! A theme names the vendor whose canned license template applies and
//! which skin the acceptance page uses. Directories published with a bare
//! `EULA.txt` pick their theme from the path; per-file
//! `<name>.EULA.txt.<vendor>` markers name it explicitly.

/// Theme used when nothing more specific applies.
pub const DEFAULT_THEME: &str = "linaro";

/// Path substring to theme, checked in order.
const PATH_THEMES: &[(&str, &str)] = &[("snowball", "stericsson"), ("origen", "samsung")];

/// Theme for a legacy `EULA.txt` directory, chosen by path substring.
pub fn theme_for_path(path: &str) -> &'static str {
    PATH_THEMES
        .iter()
        .find(|(needle, _)| path.contains(needle))
        .map(|(_, theme)| *theme)
        .unwrap_or(DEFAULT_THEME)
}

/// Whether `name` may be used to build a template file name.
///
/// Vendor names come from file extensions on published artifacts, so they
/// are untrusted. Only ASCII alphanumerics, `-` and `_` are allowed.
pub fn is_valid_theme_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
