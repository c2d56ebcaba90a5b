//! Username and email rules.
//!
//! Every check is pure: the [`Validator`] only carries the configured
//! blocklist and never touches the store.

use std::collections::HashSet;

use validator::ValidateEmail;

/// Longest accepted username, in characters.
pub const USERNAME_MAX_LENGTH: usize = 20;
/// Longest accepted email address, in bytes (RFC 5321 path limit).
pub const EMAIL_MAX_LENGTH: usize = 254;

/// Characters a username may never contain.
pub const RESERVED_CHARACTERS: &[char] = &[
    '`', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '+', '=', ';', ':',
    '\'', '"', ',', '<', '.', '>', '/', '?', ' ', '\\',
];

/// Blocklist used when the configuration does not provide one.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "damn", "hell", "crap", "shit", "fuck", "bitch", "bastard", "asshole",
];

pub type Outcome = std::result::Result<String, Rejection>;

/// Why a candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("{field} {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },
    #[error("`{0}` is a blocked word")]
    BlockedWord(String),
}

impl Rejection {
    fn format(field: &'static str, reason: &'static str) -> Self {
        Rejection::InvalidFormat { field, reason }
    }
}

/// Whether `candidate` could be read as a filesystem path.
///
/// No valid username or email ever satisfies this.
pub fn is_path_like(candidate: &str) -> bool {
    candidate.contains(['/', '\\'])
        || candidate.contains("..")
        || candidate.chars().any(char::is_control)
}

/// Checks length and charset of a username, ignoring the blocklist.
pub fn check_username_format(candidate: &str) -> Result<(), Rejection> {
    let length = candidate.chars().count();
    if length == 0 {
        return Err(Rejection::format("username", "must not be empty"));
    }
    if length > USERNAME_MAX_LENGTH {
        return Err(Rejection::format(
            "username",
            "must be at most 20 characters long",
        ));
    }

    if candidate.chars().any(|c| {
        RESERVED_CHARACTERS.contains(&c) || c.is_whitespace() || c.is_control()
    }) {
        return Err(Rejection::format(
            "username",
            "contains a reserved character",
        ));
    }

    Ok(())
}

/// Checks the structure of an email address.
pub fn check_email_format(candidate: &str) -> Result<(), Rejection> {
    if candidate.is_empty() {
        return Err(Rejection::format("email", "must not be empty"));
    }
    if candidate.len() > EMAIL_MAX_LENGTH
        || is_path_like(candidate)
        || !candidate.validate_email()
    {
        return Err(Rejection::format("email", "must be a valid email address"));
    }

    Ok(())
}

/// Normalized form an email is stored and compared with.
pub fn normalize_email(candidate: &str) -> String {
    candidate.trim().to_lowercase()
}

/// Username and email validator.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    blocklist: HashSet<String>,
}

impl Validator {
    /// Create a new [`Validator`] refusing every word of `blocklist`.
    ///
    /// Words are compared exactly, case included.
    pub fn new<I, S>(blocklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            blocklist: blocklist
                .into_iter()
                .map(|word| word.as_ref().trim().to_owned())
                .filter(|word| !word.is_empty())
                .collect(),
        }
    }

    /// Whether `candidate` is on the blocklist.
    pub fn is_blocked(&self, candidate: &str) -> bool {
        self.blocklist.contains(candidate)
    }

    /// Validate a username. Success carries the username unchanged.
    pub fn username(&self, candidate: &str) -> Outcome {
        check_username_format(candidate)?;

        if self.is_blocked(candidate) {
            return Err(Rejection::BlockedWord(candidate.to_owned()));
        }

        Ok(candidate.to_owned())
    }

    /// Validate an email. Success carries the normalized address.
    pub fn email(&self, candidate: &str) -> Outcome {
        let email = normalize_email(candidate);
        check_email_format(&email)?;
        Ok(email)
    }
}
