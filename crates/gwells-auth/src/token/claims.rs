//! Access token claims.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `aud` claim, which identity providers send as a string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience.
    Single(String),
    /// Several audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Returns `true` if `expected` is the audience, or one of them.
    #[must_use]
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Self::Single(aud) => aud == expected,
            Self::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// Claims of a verified access token.
///
/// Claims not modelled as fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject.
    #[serde(default)]
    pub sub: String,

    /// Issuer.
    pub iss: String,

    /// Audience.
    pub aud: Audience,

    /// Expiration time (Unix seconds).
    pub exp: i64,

    /// Issued at (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Every other claim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Returns the string values of a list claim, or a single string claim.
    ///
    /// Missing claims and non-string entries yield nothing.
    #[must_use]
    pub fn string_list(&self, claim: &str) -> Vec<String> {
        match self.extra.get(claim) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect(),
            Some(Value::String(item)) => vec![item.clone()],
            _ => Vec::new(),
        }
    }
}

/// The parts of a token read before its signature is checked.
///
/// Nothing here is trusted until the signature verifies.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UnverifiedClaims {
    #[serde(default)]
    pub aud: Option<Audience>,
    #[serde(default)]
    pub iss: Option<String>,
}
