//! Glob matching for `filename:<glob>` directives, supporting `*` and `?`.

use globset::GlobBuilder;

/// Matches `filename` against `pattern`, treating `*` and `?` as glob
/// wildcards and nothing else special (no brace expansion, no character
/// classes — the grammar in `spec.md` §6 only names the two wildcards).
/// An unparsable pattern matches nothing rather than erroring, consistent
/// with [`super::PostQuery::parse`]'s "never fails" posture.
pub fn glob_match(pattern: &str, filename: &str) -> bool {
    let Ok(glob) = GlobBuilder::new(pattern).literal_separator(false).build() else {
        return false;
    };
    glob.compile_matcher().is_match(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_any_run_of_characters() {
        assert!(glob_match("*.png", "a.png"));
        assert!(glob_match("*.png", "sub/dir/a.png"));
        assert!(!glob_match("*.png", "a.jpg"));
    }

    #[test]
    fn question_mark_matches_single_character() {
        assert!(glob_match("a?.png", "ab.png"));
        assert!(!glob_match("a?.png", "abc.png"));
    }
}
