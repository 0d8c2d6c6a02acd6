//! The post-list query grammar consumed by the (unimplemented) HTTP
//! layer's post-list endpoint. See `spec.md` §6.
//!
//! Grammar: space-separated tokens, a leading `-` negates a bare tag or a
//! directive; `key:value` directives (`type:`, `tag-count:`, `favorite:`,
//! `filename:`, `sort:`); backslash escapes a literal colon inside a tag
//! name. No parser-combinator crate is reached for — the grammar is small
//! and linear, so a hand-rolled tokenizer is the idiomatic choice here.

mod glob;

pub use glob::glob_match;

/// Media kind accepted by `type:`/`-type:` directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Gif,
    Video,
}

impl MediaKind {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "image" => Some(MediaKind::Image),
            "gif" => Some(MediaKind::Gif),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// Comparison operator for `tag-count:<op><int>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagCountFilter {
    pub op: CompareOp,
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    FileModifiedDate,
    ImportDate,
    TagCount,
    Width,
    Height,
    SizeBytes,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::FileModifiedDate,
            direction: SortDirection::Desc,
        }
    }
}

/// The parsed, structured form of a post-list query string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostQuery {
    pub included_tags: Vec<String>,
    pub excluded_tags: Vec<String>,
    pub included_types: Vec<MediaKind>,
    pub excluded_types: Vec<MediaKind>,
    pub tag_count: Option<TagCountFilter>,
    pub favorite: Option<bool>,
    pub filename_glob: Option<String>,
    pub excluded_filename_glob: Option<String>,
    pub sort: Sort,
}

impl PostQuery {
    /// Parses a query string into its structured form. Never fails:
    /// unrecognized directive values are ignored rather than rejected, so
    /// the post-list endpoint degrades to "no filter for that directive"
    /// instead of a hard error on a typo.
    pub fn parse(input: &str) -> PostQuery {
        let mut query = PostQuery {
            sort: Sort::default(),
            ..Default::default()
        };

        for raw_token in tokenize(input) {
            let (negated, token) = match raw_token.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, raw_token.as_str()),
            };

            match split_directive(token) {
                Some(("type", value)) => {
                    let kinds: Vec<MediaKind> = value.split(',').filter_map(MediaKind::parse).collect();
                    if negated {
                        query.excluded_types.extend(kinds);
                    } else {
                        query.included_types.extend(kinds);
                    }
                }
                Some(("tag-count", value)) if !negated => {
                    if let Some(filter) = parse_tag_count(value) {
                        query.tag_count = Some(filter);
                    }
                }
                Some(("favorite", value)) if !negated => {
                    if let Ok(b) = value.parse::<bool>() {
                        query.favorite = Some(b);
                    }
                }
                Some(("filename", value)) => {
                    if negated {
                        query.excluded_filename_glob = Some(value.to_string());
                    } else {
                        query.filename_glob = Some(value.to_string());
                    }
                }
                Some(("sort", value)) if !negated => {
                    if let Some(sort) = parse_sort(value) {
                        query.sort = sort;
                    }
                }
                _ => {
                    if token.is_empty() {
                        continue;
                    }
                    if negated {
                        query.excluded_tags.push(token.to_string());
                    } else {
                        query.included_tags.push(token.to_string());
                    }
                }
            }
        }

        query
    }
}

/// Splits `input` into whitespace-delimited tokens, treating a backslash
/// as escaping the following character (most usefully a literal `:`
/// inside a tag name) rather than a token boundary.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Splits a `key:value` directive on its first unescaped colon (escaping
/// already resolved by [`tokenize`], so this is a plain first-colon
/// split). Returns `None` for bare tags with no colon.
fn split_directive(token: &str) -> Option<(&str, &str)> {
    let idx = token.find(':')?;
    Some((&token[..idx], &token[idx + 1..]))
}

fn parse_tag_count(value: &str) -> Option<TagCountFilter> {
    let (op, rest) = if let Some(rest) = value.strip_prefix(">=") {
        (CompareOp::Gte, rest)
    } else if let Some(rest) = value.strip_prefix("<=") {
        (CompareOp::Lte, rest)
    } else if let Some(rest) = value.strip_prefix('>') {
        (CompareOp::Gt, rest)
    } else if let Some(rest) = value.strip_prefix('<') {
        (CompareOp::Lt, rest)
    } else if let Some(rest) = value.strip_prefix('=') {
        (CompareOp::Eq, rest)
    } else {
        (CompareOp::Eq, value)
    };
    rest.parse::<i64>().ok().map(|value| TagCountFilter { op, value })
}

fn parse_sort(value: &str) -> Option<Sort> {
    let mut parts = value.splitn(2, ':');
    let field_token = parts.next()?;
    let direction_token = parts.next();

    let (field, default_direction) = match field_token {
        "file-modified-date" => (SortField::FileModifiedDate, SortDirection::Desc),
        "new" | "newest" => (SortField::FileModifiedDate, SortDirection::Desc),
        "old" | "oldest" => (SortField::FileModifiedDate, SortDirection::Asc),
        "import-date" => (SortField::ImportDate, SortDirection::Desc),
        "tag-count" => (SortField::TagCount, SortDirection::Desc),
        "width" => (SortField::Width, SortDirection::Desc),
        "height" => (SortField::Height, SortDirection::Desc),
        "size-bytes" => (SortField::SizeBytes, SortDirection::Desc),
        "id" => (SortField::Id, SortDirection::Desc),
        _ => return None,
    };

    let direction = match direction_token {
        Some("asc") => SortDirection::Asc,
        Some("desc") => SortDirection::Desc,
        _ => default_direction,
    };

    Some(Sort { field, direction })
}

impl TagCountFilter {
    pub fn matches(&self, count: i64) -> bool {
        match self.op {
            CompareOp::Eq => count == self.value,
            CompareOp::Gt => count > self.value,
            CompareOp::Gte => count >= self.value,
            CompareOp::Lt => count < self.value,
            CompareOp::Lte => count <= self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_included_and_excluded_tags_with_type_and_sort() {
        let query = PostQuery::parse("a -b type:image sort:new");
        assert_eq!(query.included_tags, vec!["a".to_string()]);
        assert_eq!(query.excluded_tags, vec!["b".to_string()]);
        assert_eq!(query.included_types, vec![MediaKind::Image]);
        assert_eq!(query.sort, Sort { field: SortField::FileModifiedDate, direction: SortDirection::Desc });
    }

    #[test]
    fn empty_query_yields_defaults() {
        let query = PostQuery::parse("");
        assert_eq!(query, PostQuery { sort: Sort::default(), ..Default::default() });
    }

    #[test]
    fn tag_count_operators_parse_and_match() {
        let query = PostQuery::parse("tag-count:>=3");
        let filter = query.tag_count.expect("tag-count filter");
        assert_eq!(filter.op, CompareOp::Gte);
        assert!(filter.matches(3));
        assert!(!filter.matches(2));
    }

    #[test]
    fn favorite_directive_parses_bool() {
        assert_eq!(PostQuery::parse("favorite:true").favorite, Some(true));
        assert_eq!(PostQuery::parse("favorite:false").favorite, Some(false));
    }

    #[test]
    fn backslash_escapes_literal_colon_in_tag_name() {
        let query = PostQuery::parse(r"a\:b");
        assert_eq!(query.included_tags, vec!["a:b".to_string()]);
    }

    #[test]
    fn multiple_types_split_on_comma() {
        let query = PostQuery::parse("type:image,gif,video");
        assert_eq!(query.included_types.len(), 3);
    }

    #[test]
    fn unknown_sort_falls_back_to_default() {
        let query = PostQuery::parse("sort:bogus-field");
        assert_eq!(query.sort, Sort::default());
    }
}
