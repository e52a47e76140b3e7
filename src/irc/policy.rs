//! Which list entries belong in the ledger.
//!
//! Bans placed by the network itself (server-set entries on ban lists) are
//! not the channel operators' doing and are left out of the ledger.

use crate::db::ListedBan;

/// Decides whether a ban list entry was set by the network rather than a
/// person.
pub trait SetterPolicy: Send + Sync {
    fn is_server_setter(&self, set_by: &str) -> bool;

    /// Drop server-set entries from a collated ban list.
    fn retain_user_set(&self, listed: Vec<ListedBan>) -> Vec<ListedBan> {
        listed
            .into_iter()
            .filter(|ban| !self.is_server_setter(&ban.set_by))
            .collect()
    }
}

/// Treats `<name><suffix>` setters (one label in front of the network's
/// server suffix) as servers.
#[derive(Debug, Clone)]
pub struct ServerSuffixPolicy {
    suffix: String,
}

impl ServerSuffixPolicy {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into().to_ascii_lowercase(),
        }
    }
}

impl SetterPolicy for ServerSuffixPolicy {
    fn is_server_setter(&self, set_by: &str) -> bool {
        if self.suffix.is_empty() || set_by.contains('!') {
            return false;
        }
        set_by
            .to_ascii_lowercase()
            .strip_suffix(&self.suffix)
            .is_some_and(|name| !name.is_empty() && !name.contains('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listed(set_by: &str) -> ListedBan {
        ListedBan {
            mask: "*!*@spam.example".into(),
            set_by: set_by.into(),
            set_at: 0,
        }
    }

    #[test]
    fn test_server_suffix() {
        let policy = ServerSuffixPolicy::new(".freenode.net");
        assert!(policy.is_server_setter("card.freenode.net"));
        assert!(policy.is_server_setter("Card.Freenode.NET"));
        assert!(!policy.is_server_setter("op!op@staff.freenode.net"));
        assert!(!policy.is_server_setter("op"));
        assert!(!policy.is_server_setter("evil.card.freenode.net"));
    }

    #[test]
    fn test_retain_user_set() {
        let policy = ServerSuffixPolicy::new(".freenode.net");
        let kept = policy.retain_user_set(vec![listed("leguin.freenode.net"), listed("op!o@h")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].set_by, "op!o@h");
    }

    #[test]
    fn test_empty_suffix_keeps_everything() {
        let policy = ServerSuffixPolicy::new("");
        assert!(!policy.is_server_setter("irc.example.net"));
    }
}
