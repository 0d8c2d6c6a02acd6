//! Relative-path normalization shared by the sync processor's ignored-prefix
//! and excluded-file checks.

/// Backslashes become forward slashes, leading/trailing slashes are
/// trimmed, and a bare `"."` normalizes to the empty string (the library
/// root itself).
pub fn normalize_relative_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let trimmed = replaced.trim_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// `true` iff `normalized` is `prefix` itself or lies within its subtree.
pub fn is_within_prefix(normalized: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    normalized == prefix || normalized.starts_with(&format!("{prefix}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes_and_slashes() {
        assert_eq!(normalize_relative_path("sub\\b.mp4"), "sub/b.mp4");
        assert_eq!(normalize_relative_path("/a/b/"), "a/b");
        assert_eq!(normalize_relative_path("."), "");
    }

    #[test]
    fn prefix_matching_requires_segment_boundary() {
        assert!(is_within_prefix("clips", "clips"));
        assert!(is_within_prefix("clips/b.mp4", "clips"));
        assert!(!is_within_prefix("clipsextra/b.mp4", "clips"));
        assert!(!is_within_prefix("a/b", ""));
    }
}
