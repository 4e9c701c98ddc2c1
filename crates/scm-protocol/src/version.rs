//! Protocol version allow-list.

/// Versions accepted by the negotiator, oldest first.
pub const SUPPORTED_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Version assumed when a client does not declare one.
pub const DEFAULT_VERSION: &str = SUPPORTED_VERSIONS[0];

/// Resolve a declared version against the allow-list.
///
/// `None` resolves to [`DEFAULT_VERSION`]; an unsupported value yields `None`.
pub fn negotiate_version(declared: Option<&str>) -> Option<&'static str> {
    match declared.map(str::trim) {
        None | Some("") => Some(DEFAULT_VERSION),
        Some(v) => SUPPORTED_VERSIONS.iter().copied().find(|s| *s == v),
    }
}
