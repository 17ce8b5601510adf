//! Host pattern matching with OpenSSH glob semantics.
//!
//! - `*` matches any run of characters (including none)
//! - `?` matches exactly one character
//! - everything else matches literally, ignoring ASCII case
//!
//! Matching is anchored: the whole pattern must cover the whole hostname.
//! A pattern prefixed with `!` negates; if any negated pattern in a `Host`
//! line matches, the whole line does not match.

/// Check a single (non-negated) pattern against a hostname
pub fn pattern_matches(pattern: &str, hostname: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let hostname: Vec<char> = hostname.chars().map(|c| c.to_ascii_lowercase()).collect();
    glob(&pattern, &hostname)
}

/// Iterative wildcard match with single-star backtracking.
fn glob(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Check a `Host` line's pattern list against a hostname.
///
/// True when at least one positive pattern matches and no negated pattern does.
pub fn host_patterns_match<S: AsRef<str>>(patterns: &[S], hostname: &str) -> bool {
    let mut matched = false;
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if let Some(negated) = pattern.strip_prefix('!') {
            if pattern_matches(negated, hostname) {
                return false;
            }
        } else if pattern_matches(pattern, hostname) {
            matched = true;
        }
    }
    matched
}

/// Whether a pattern is a plain hostname with no wildcard or negation
pub fn is_literal(pattern: &str) -> bool {
    !pattern.is_empty() && !pattern.contains(['*', '?', '!'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match_is_case_insensitive() {
        assert!(pattern_matches("GitHub.com", "github.com"));
        assert!(pattern_matches("github.com", "GITHUB.COM"));
        assert!(!pattern_matches("github.com", "gitlab.com"));
    }

    #[test]
    fn test_match_is_anchored() {
        assert!(!pattern_matches("github.com", "api.github.com"));
        assert!(!pattern_matches("github", "github.com"));
        assert!(!pattern_matches("github.com", "github.co"));
    }

    #[test]
    fn test_star_subdomain() {
        assert!(pattern_matches("*.github.com", "api.github.com"));
        assert!(pattern_matches("*.github.com", "a.b.github.com"));
        assert!(!pattern_matches("*.github.com", "github.com"));
    }

    #[test]
    fn test_star_matches_everything() {
        assert!(pattern_matches("*", "anything.example"));
        assert!(pattern_matches("*", ""));
        assert!(pattern_matches("git*", "git"));
        assert!(pattern_matches("*hub*", "github.com"));
    }

    #[test]
    fn test_question_mark() {
        assert!(pattern_matches("host?", "host1"));
        assert!(!pattern_matches("host?", "host"));
        assert!(!pattern_matches("host?", "host12"));
        assert!(pattern_matches("10.0.0.?", "10.0.0.7"));
    }

    #[test]
    fn test_star_backtracking() {
        assert!(pattern_matches("*.*.com", "a.b.com"));
        assert!(pattern_matches("a*b*c", "aXXbYYbZc"));
        assert!(!pattern_matches("a*b*c", "aXXbYY"));
    }

    #[test]
    fn test_host_patterns_any_positive() {
        assert!(host_patterns_match(&["gitlab.com", "github.com"], "github.com"));
        assert!(!host_patterns_match(&["gitlab.com", "bitbucket.org"], "github.com"));
    }

    #[test]
    fn test_host_patterns_negation() {
        let patterns = ["*", "!bastion"];
        assert!(host_patterns_match(&patterns, "github.com"));
        assert!(!host_patterns_match(&patterns, "bastion"));
        assert!(!host_patterns_match(&patterns, "BASTION"));
    }

    #[test]
    fn test_negation_only_never_matches() {
        assert!(!host_patterns_match(&["!bastion"], "github.com"));
    }

    #[test]
    fn test_is_literal() {
        assert!(is_literal("github.com"));
        assert!(!is_literal("*.github.com"));
        assert!(!is_literal("host?"));
        assert!(!is_literal("!bastion"));
        assert!(!is_literal(""));
    }
}
