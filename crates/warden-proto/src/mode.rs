//! Channel mode parsing.
//!
//! Which letters consume an argument depends on the server, so parsing is
//! driven by a [`ChannelModeSpec`] built from the `CHANMODES` and `PREFIX`
//! tokens of `RPL_ISUPPORT`.

use crate::error::MessageParseError;

/// A single channel mode change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// `+letter [arg]`
    Plus(char, Option<String>),
    /// `-letter [arg]`
    Minus(char, Option<String>),
}

impl Mode {
    /// True for `+` changes.
    pub fn is_set(&self) -> bool {
        matches!(self, Mode::Plus(..))
    }

    /// The mode letter.
    pub fn letter(&self) -> char {
        match self {
            Mode::Plus(c, _) | Mode::Minus(c, _) => *c,
        }
    }

    /// The mode argument, if any.
    pub fn arg(&self) -> Option<&str> {
        match self {
            Mode::Plus(_, arg) | Mode::Minus(_, arg) => arg.as_deref(),
        }
    }
}

/// Server-advertised classification of channel mode letters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelModeSpec {
    /// Type A: list modes, always take an argument.
    pub list: String,
    /// Type B: always take an argument.
    pub always_arg: String,
    /// Type C: take an argument only when set.
    pub set_arg: String,
    /// Membership prefix modes (`o`, `h`, `v`...), always take an argument.
    pub prefix: String,
}

impl Default for ChannelModeSpec {
    fn default() -> Self {
        Self {
            list: "beIq".to_owned(),
            always_arg: "k".to_owned(),
            set_arg: "flj".to_owned(),
            prefix: "ohv".to_owned(),
        }
    }
}

impl ChannelModeSpec {
    /// Update from one `RPL_ISUPPORT` token. Unrelated tokens are ignored.
    ///
    /// ```
    /// use warden_proto::ChannelModeSpec;
    ///
    /// let mut spec = ChannelModeSpec::default();
    /// spec.apply_isupport("CHANMODES=eIbq,k,flj,CFLMPQScgimnprstz");
    /// spec.apply_isupport("PREFIX=(ov)@+");
    /// assert_eq!(spec.prefix, "ov");
    /// assert!(spec.takes_arg('q', false));
    /// ```
    pub fn apply_isupport(&mut self, token: &str) {
        if let Some(value) = token.strip_prefix("CHANMODES=") {
            let mut groups = value.split(',');
            self.list = groups.next().unwrap_or_default().to_owned();
            self.always_arg = groups.next().unwrap_or_default().to_owned();
            self.set_arg = groups.next().unwrap_or_default().to_owned();
        } else if let Some(value) = token.strip_prefix("PREFIX=") {
            if let Some(modes) = value
                .strip_prefix('(')
                .and_then(|rest| rest.split_once(')'))
                .map(|(modes, _)| modes)
            {
                self.prefix = modes.to_owned();
            }
        }
    }

    /// Whether `letter` consumes an argument in the given direction.
    pub fn takes_arg(&self, letter: char, adding: bool) -> bool {
        self.list.contains(letter)
            || self.always_arg.contains(letter)
            || self.prefix.contains(letter)
            || (adding && self.set_arg.contains(letter))
    }

    /// Parse a channel `MODE` parameter list (`["+bo-q", "a", "b", "c"]`).
    pub fn parse(&self, args: &[String]) -> Result<Vec<Mode>, MessageParseError> {
        let Some((modestring, rest)) = args.split_first() else {
            return Ok(Vec::new());
        };

        let mut params = rest.iter();
        let mut adding = true;
        let mut modes = Vec::new();

        for c in modestring.chars() {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                letter => {
                    let arg = if self.takes_arg(letter, adding) {
                        let arg = params.next().ok_or_else(|| {
                            MessageParseError::InvalidModeArg(format!(
                                "{}{letter} needs an argument",
                                if adding { '+' } else { '-' }
                            ))
                        })?;
                        Some(arg.clone())
                    } else {
                        None
                    };
                    modes.push(if adding {
                        Mode::Plus(letter, arg)
                    } else {
                        Mode::Minus(letter, arg)
                    });
                }
            }
        }

        Ok(modes)
    }
}
