//! Ban mask helpers.
//!
//! A mask is either a `nick!user@host` glob, matched with `*` and `?`
//! under RFC 1459 casemapping, or an extended form such as `$a:account`
//! which only the server can evaluate.

use crate::casemap::irc_lower_char;

/// Match `text` against a glob `pattern` containing `*` and `?`.
///
/// ```
/// use warden_proto::wildcard_match;
///
/// assert!(wildcard_match("troll!*@*", "Troll!~t@host.example"));
/// assert!(wildcard_match("*!*@*.example.com", "nick!user@HOST.EXAMPLE.COM"));
/// assert!(!wildcard_match("*!admin@*", "nick!user@host"));
/// ```
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(irc_lower_char).collect();
    let text: Vec<char> = text.chars().map(irc_lower_char).collect();

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
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Match a full `nick!user@host` against a ban mask.
#[inline]
pub fn matches_hostmask(mask: &str, hostmask: &str) -> bool {
    !is_extended_mask(mask) && wildcard_match(mask, hostmask)
}

/// Extended masks (`$a:account`, `$~a`, ...) start with `$`.
#[inline]
pub fn is_extended_mask(mask: &str) -> bool {
    mask.starts_with('$')
}

/// Build the account extban for `account`.
pub fn account_mask(account: &str) -> String {
    format!("$a:{account}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtracking() {
        assert!(wildcard_match("*a*b", "zazb"));
        assert!(wildcard_match("*a*b", "zaazb"));
        assert!(!wildcard_match("*a*b", "zazc"));
        assert!(wildcard_match("a*b", "acccb"));
        assert!(!wildcard_match("a*b", "acbc"));
    }

    #[test]
    fn test_edges() {
        assert!(wildcard_match("", ""));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("", "a"));
        assert!(wildcard_match("test*", "test"));
        assert!(!wildcard_match("?test", "test"));
    }

    #[test]
    fn test_extended_masks_never_glob() {
        assert!(is_extended_mask("$a:troll"));
        assert!(!matches_hostmask("$a:*", "troll!t@host"));
        assert_eq!(account_mask("troll"), "$a:troll");
    }
}
