//! Order lifecycle types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order status. Stored and serialized as SCREAMING_SNAKE_CASE.
///
/// The only transition is `Created -> EmailSent`, applied when the
/// notifications service confirms the email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    EmailSent,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::EmailSent => "EMAIL_SENT",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    /// Case-insensitive; legacy rows were written with mixed casing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("CREATED") {
            Ok(Self::Created)
        } else if s.eq_ignore_ascii_case("EMAIL_SENT") {
            Ok(Self::EmailSent)
        } else {
            Err(UnknownOrderStatus(s.to_owned()))
        }
    }
}
