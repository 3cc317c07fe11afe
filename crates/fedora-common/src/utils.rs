//! Blank-value helpers
//!
//! A value is blank when it is empty or consists only of whitespace.

/// Check whether a string is empty or whitespace only
///
/// # Examples
///
/// ```
/// use fedora_common::is_blank;
///
/// assert!(is_blank(""));
/// assert!(is_blank("  \n\t"));
/// assert!(!is_blank(" hello "));
/// ```
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Byte-oriented variant of [`is_blank`] for raw content
pub fn is_blank_bytes(value: &[u8]) -> bool {
    value.iter().all(|b| b.is_ascii_whitespace())
}
