//! Ban ledger models.

use std::fmt;

/// Which channel list a ledger row tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BanMode {
    /// `+b`
    Ban,
    /// `+q`
    Quiet,
}

impl BanMode {
    /// Mode letter on the wire.
    pub fn letter(self) -> char {
        match self {
            BanMode::Ban => 'b',
            BanMode::Quiet => 'q',
        }
    }

    /// Mode letter as stored in the `mode` column.
    pub fn as_str(self) -> &'static str {
        match self {
            BanMode::Ban => "b",
            BanMode::Quiet => "q",
        }
    }

    /// Parse a mode letter; other letters are not tracked.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'b' => Some(BanMode::Ban),
            'q' => Some(BanMode::Quiet),
            _ => None,
        }
    }
}

impl fmt::Display for BanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row type: (id, channel, mask, mode, set_at, set_by, expire_at, reason, unset_at, unset_by)
pub(super) type BanRow = (
    i64,
    String,
    String,
    String,
    i64,
    String,
    Option<i64>,
    String,
    Option<i64>,
    Option<String>,
);

/// One ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRecord {
    pub id: i64,
    pub channel: String,
    pub mask: String,
    /// `b` or `q`.
    pub mode: String,
    pub set_at: i64,
    /// Hostmask of the setter, or the bot's nick.
    pub set_by: String,
    /// `None` never expires.
    pub expire_at: Option<i64>,
    pub reason: String,
    pub unset_at: Option<i64>,
    pub unset_by: Option<String>,
}

impl BanRecord {
    pub(super) fn from_row(row: BanRow) -> Self {
        let (id, channel, mask, mode, set_at, set_by, expire_at, reason, unset_at, unset_by) =
            row;
        Self {
            id,
            channel,
            mask,
            mode,
            set_at,
            set_by,
            expire_at,
            reason,
            unset_at,
            unset_by,
        }
    }

    /// Whether the expiry time has passed at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expire_at.is_some_and(|at| at < now)
    }
}

/// An active row that an unset just closed and that had not yet expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorBan {
    pub set_by: String,
    pub set_at: i64,
    pub expire_at: Option<i64>,
}

/// An active row whose expiry has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredBan {
    pub channel: String,
    pub mask: String,
    pub mode: BanMode,
}

/// One entry of a server ban or quiet list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedBan {
    pub mask: String,
    pub set_by: String,
    pub set_at: i64,
}
