//! Glob key patterns
//!
//! Redis-style glob syntax (`*`, `?`, `[abc]`, `\` escapes) shared by the
//! memory provider and by the local tier, which has no native scan. Braces
//! are literal, as in Redis `SCAN MATCH`; there is no `{a,b}` alternation.

use globset::{GlobBuilder, GlobMatcher};
use opscache_domain::error::{Error, Result};

/// Compiled glob pattern over cache keys
#[derive(Debug, Clone)]
pub struct KeyPattern {
    raw: String,
    matcher: GlobMatcher,
}

impl KeyPattern {
    /// Compile a glob pattern
    ///
    /// `*` matches across `:` separators, as it does in Redis.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(Error::invalid_invalidation_request(
                "Key pattern cannot be empty",
            ));
        }

        let escaped = literal_braces(pattern);
        let glob = GlobBuilder::new(&escaped)
            .literal_separator(false)
            .backslash_escape(true)
            .build()
            .map_err(|e| {
                Error::invalid_invalidation_request(format!("Invalid key pattern '{pattern}': {e}"))
            })?;

        Ok(Self {
            raw: pattern.to_string(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Whether `key` matches the pattern
    pub fn matches(&self, key: &str) -> bool {
        self.matcher.is_match(key)
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Escape `{` and `}` outside character classes so they match themselves
fn literal_braces(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_class => {
                escaped.push(c);
                if let Some(next) = chars.next() {
                    escaped.push(next);
                }
            }
            '[' if !in_class => {
                in_class = true;
                escaped.push(c);
                if let Some(negation) = chars.next_if(|next| matches!(*next, '!' | '^')) {
                    escaped.push(negation);
                }
                // A leading `]` is a class member
                if let Some(bracket) = chars.next_if_eq(&']') {
                    escaped.push(bracket);
                }
            }
            ']' if in_class => {
                in_class = false;
                escaped.push(c);
            }
            '{' | '}' if !in_class => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
