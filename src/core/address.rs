//! Address normalization for user-entered navigation targets.

/// Scheme prefixed onto addresses typed without one.
pub const DEFAULT_SCHEME: &str = "https";

/// Normalizes a typed address into something a surface can load.
///
/// Returns `None` for empty or whitespace-only input. Input that already
/// carries a `scheme://` prefix is returned trimmed; anything else gets
/// `https://` prepended.
pub fn ensure_http_url(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if has_scheme(trimmed) {
        return Some(trimmed.to_string());
    }

    Some(format!("{DEFAULT_SCHEME}://{trimmed}"))
}

/// Matches `[a-zA-Z][a-zA-Z0-9+.-]*://` at the start of the string.
fn has_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_https() {
        assert_eq!(
            ensure_http_url("example.com").as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_existing_scheme_is_kept() {
        assert_eq!(
            ensure_http_url("http://example.com/a").as_deref(),
            Some("http://example.com/a")
        );
        assert_eq!(
            ensure_http_url("git+ssh://host/repo").as_deref(),
            Some("git+ssh://host/repo")
        );
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(
            ensure_http_url("  example.com/path  ").as_deref(),
            Some("https://example.com/path")
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert_eq!(ensure_http_url(""), None);
        assert_eq!(ensure_http_url("   \t\n"), None);
    }

    #[test]
    fn test_scheme_must_start_with_letter() {
        // "1http://x" is not a scheme, so it gets prefixed
        assert_eq!(
            ensure_http_url("1http://x").as_deref(),
            Some("https://1http://x")
        );
    }

    #[test]
    fn test_scheme_without_slashes_is_prefixed() {
        assert_eq!(
            ensure_http_url("localhost:8080").as_deref(),
            Some("https://localhost:8080")
        );
    }
}
