//! Session claims carried in the auth cookie.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// User email.
    pub email: String,
    /// Display name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        email: &str,
        name: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id,
            email: email.to_string(),
            name: name.map(String::from),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Whether more than half of the session lifetime has elapsed at `now`.
    #[must_use]
    pub const fn is_past_half_life(&self, now: i64) -> bool {
        let lifetime = self.exp - self.iat;
        now - self.iat > lifetime / 2
    }
}
