//! Utility functions for proxy lists.

/// Extract proxy entries from a newline separated list.
///
/// Blank lines and `#` comments are skipped. Every other line is returned
/// trimmed, so a malformed entry still reaches the parser and fails there.
pub(crate) fn parse_proxy_list(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}
