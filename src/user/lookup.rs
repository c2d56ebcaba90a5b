//! Interpretation of opaque lookup tokens.

use std::fmt;

use uuid::Uuid;

use crate::validation::{
    check_email_format, check_username_format, is_path_like, normalize_email,
};

/// One strict interpretation of a lookup token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Store-assigned identifier.
    Id(Uuid),
    /// Normalized email address.
    Email(String),
    /// Username, compared case-insensitively.
    Username(String),
}

/// Token cannot denote any user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,
    #[error("token looks like a path")]
    PathLike,
}

impl Lookup {
    /// Every interpretation of `token`, in resolution order: id, then
    /// email, then username.
    ///
    /// Tokens are never paths. Separators, `..` segments and control
    /// characters are refused before any store access.
    pub fn candidates(token: &str) -> Result<Vec<Lookup>, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        if is_path_like(token) {
            return Err(TokenError::PathLike);
        }

        let mut candidates = Vec::with_capacity(1);
        if let Ok(id) = Uuid::parse_str(token) {
            candidates.push(Lookup::Id(id));
        }

        let email = normalize_email(token);
        if check_email_format(&email).is_ok() {
            candidates.push(Lookup::Email(email));
        }

        if check_username_format(token).is_ok() {
            candidates.push(Lookup::Username(token.to_owned()));
        }

        Ok(candidates)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "id={id}"),
            Lookup::Email(_) => write!(f, "email"),
            Lookup::Username(username) => write!(f, "username={username}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_token() {
        let id = Uuid::new_v4();
        assert_eq!(
            Lookup::candidates(&id.to_string()).unwrap(),
            vec![Lookup::Id(id)]
        );
    }

    #[test]
    fn test_email_token() {
        assert_eq!(
            Lookup::candidates("Abc1@Email.com").unwrap(),
            vec![Lookup::Email("abc1@email.com".into())]
        );
    }

    #[test]
    fn test_username_token() {
        assert_eq!(
            Lookup::candidates("abc1").unwrap(),
            vec![Lookup::Username("abc1".into())]
        );
    }

    #[test]
    fn test_unusable_token() {
        // Neither an id, an email, nor a username.
        assert!(Lookup::candidates("a name with spaces").unwrap().is_empty());
    }

    #[test]
    fn test_path_like_tokens() {
        for token in [
            "../../etc/passwd",
            "/../../../../etc/passwd",
            "..",
            "a/b",
            "a\\b",
            "line\nbreak",
        ] {
            assert_eq!(
                Lookup::candidates(token),
                Err(TokenError::PathLike),
                "{token:?}"
            );
        }
        assert_eq!(Lookup::candidates(""), Err(TokenError::Empty));
    }
}
