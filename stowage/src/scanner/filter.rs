use std::collections::HashSet;

/// Exclusion filter built from `exclude_keys` and `exclude_patterns`.
///
/// Patterns are anchored wildcards: `*` matches any run of characters (including none)
/// and `?` exactly one. `cache_*` excludes `cache_api_users` but not `app_cache`.
#[derive(Debug, Default, Clone)]
pub struct KeyFilter {
    keys: HashSet<String>,
    patterns: Vec<Vec<char>>,
}

impl KeyFilter {
    /// Builds a filter from exact keys and wildcard patterns.
    #[must_use]
    pub fn new(exclude_keys: &[String], exclude_patterns: &[String]) -> Self {
        Self {
            keys: exclude_keys.iter().cloned().collect(),
            patterns: exclude_patterns
                .iter()
                .map(|pattern| pattern.chars().collect())
                .collect(),
        }
    }

    /// Whether `key` should be skipped.
    #[must_use]
    pub fn excludes(&self, key: &str) -> bool {
        if self.keys.contains(key) {
            return true;
        }
        if self.patterns.is_empty() {
            return false;
        }
        let key: Vec<char> = key.chars().collect();
        self.patterns
            .iter()
            .any(|pattern| wildcard_match(pattern, &key))
    }
}

/// Iterative wildcard match with single-star backtracking; linear in practice.
fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
