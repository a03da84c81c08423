//! Placeholder token issuance and verification.
//!
//! The login flow is intentionally tokenless: there is no password, no
//! signature, and no server-side session state. Tokens are opaque strings
//! encoding the user id and issue timestamp, verified by parsing the same
//! string back apart. The `TokenService` trait is the seam where a real
//! scheme (signed tokens, session store) can be substituted without touching
//! callers.

use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;

/// Prefix every issued token starts with.
const TOKEN_PREFIX: &str = "medal_token_";

/// Suffix marking a token issued with the extended ("remember me") window.
const EXTENDED_SUFFIX: &str = "ext";

/// Errors that can occur during token verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token does not match the expected format.
    #[error("invalid token format")]
    Malformed,

    /// The token's validity window has elapsed.
    #[error("token has expired")]
    Expired,
}

/// A freshly issued token with its client-visible expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Opaque token string.
    pub token: String,
    /// Instant the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Human-readable validity window ("24h" or "7d").
    pub expires_in: &'static str,
}

/// Claims recovered from a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    /// User the token was issued to.
    pub user_id: i64,
    /// Instant the token was issued.
    pub issued_at: DateTime<Utc>,
    /// Instant the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl VerifiedToken {
    /// Minutes since the token was issued.
    #[must_use]
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.issued_at).num_minutes()
    }

    /// Minutes until the token expires.
    #[must_use]
    pub fn remaining_minutes(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes()
    }
}

/// Capability interface for token issuance and verification.
pub trait TokenService: Send + Sync {
    /// Issues a token for a user. `extended` requests the longer
    /// "remember me" validity window.
    fn issue(&self, user_id: i64, extended: bool) -> IssuedToken;

    /// Verifies a presented token and recovers its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` if the string does not parse and
    /// `TokenError::Expired` if its validity window has elapsed.
    fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError>;
}

/// Token service issuing opaque, unsigned tokens.
///
/// Token format: `medal_token_<user_id>_<issued_ms>` with an `_ext` suffix
/// for extended-validity tokens.
#[derive(Debug, Clone)]
pub struct OpaqueTokenService {
    validity: Duration,
    extended_validity: Duration,
}

impl Default for OpaqueTokenService {
    fn default() -> Self {
        Self::new(24, 7)
    }
}

impl OpaqueTokenService {
    /// Creates a token service with the given validity windows.
    #[must_use]
    pub fn new(validity_hours: i64, extended_validity_days: i64) -> Self {
        Self {
            validity: Duration::hours(validity_hours),
            extended_validity: Duration::days(extended_validity_days),
        }
    }

    fn window(&self, extended: bool) -> Duration {
        if extended {
            self.extended_validity
        } else {
            self.validity
        }
    }
}

impl TokenService for OpaqueTokenService {
    fn issue(&self, user_id: i64, extended: bool) -> IssuedToken {
        let now = Utc::now();
        let token = if extended {
            format!(
                "{TOKEN_PREFIX}{user_id}_{}_{EXTENDED_SUFFIX}",
                now.timestamp_millis()
            )
        } else {
            format!("{TOKEN_PREFIX}{user_id}_{}", now.timestamp_millis())
        };

        IssuedToken {
            token,
            expires_at: now + self.window(extended),
            expires_in: if extended { "7d" } else { "24h" },
        }
    }

    fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let rest = token.strip_prefix(TOKEN_PREFIX).ok_or(TokenError::Malformed)?;

        let parts: Vec<&str> = rest.split('_').collect();
        let (user_id, issued_ms, extended) = match parts.as_slice() {
            [id, ms] => (id, ms, false),
            [id, ms, suffix] if *suffix == EXTENDED_SUFFIX => (id, ms, true),
            _ => return Err(TokenError::Malformed),
        };

        let user_id: i64 = user_id.parse().map_err(|_| TokenError::Malformed)?;
        if user_id <= 0 {
            return Err(TokenError::Malformed);
        }

        let issued_ms: i64 = issued_ms.parse().map_err(|_| TokenError::Malformed)?;
        let issued_at = Utc
            .timestamp_millis_opt(issued_ms)
            .single()
            .ok_or(TokenError::Malformed)?;

        let expires_at = issued_at + self.window(extended);
        if Utc::now() > expires_at {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken {
            user_id,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> OpaqueTokenService {
        OpaqueTokenService::new(24, 7)
    }

    #[test]
    fn test_issue_token() {
        let service = create_test_service();
        let issued = service.issue(1, false);

        assert!(issued.token.starts_with("medal_token_1_"));
        assert_eq!(issued.expires_in, "24h");
    }

    #[test]
    fn test_issue_extended_token() {
        let service = create_test_service();
        let issued = service.issue(5, true);

        assert!(issued.token.ends_with("_ext"));
        assert_eq!(issued.expires_in, "7d");
    }

    #[test]
    fn test_verify_round_trip() {
        let service = create_test_service();
        let issued = service.issue(42, false);

        let verified = service.verify(&issued.token).unwrap();
        assert_eq!(verified.user_id, 42);
        assert_eq!(verified.expires_at, issued.expires_at);
    }

    #[test]
    fn test_verify_extended_round_trip() {
        let service = create_test_service();
        let issued = service.issue(7, true);

        let verified = service.verify(&issued.token).unwrap();
        assert_eq!(verified.user_id, 7);
        // Extended tokens get the 7-day window, not the 24h one.
        assert!(verified.expires_at - verified.issued_at == Duration::days(7));
    }

    #[test]
    fn test_malformed_tokens() {
        let service = create_test_service();

        assert_eq!(service.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(service.verify("medal_token_"), Err(TokenError::Malformed));
        assert_eq!(
            service.verify("medal_token_abc_123"),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            service.verify("medal_token_1_123_bogus"),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            service.verify("medal_token_-1_123"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_expired_token() {
        let service = create_test_service();
        let stale_ms = (Utc::now() - Duration::hours(25)).timestamp_millis();
        let token = format!("medal_token_1_{stale_ms}");

        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_extended_window_outlives_plain_window() {
        let service = create_test_service();
        let stale_ms = (Utc::now() - Duration::hours(25)).timestamp_millis();

        // 25 hours old: a plain token is dead, an extended one is not.
        let plain = format!("medal_token_1_{stale_ms}");
        let extended = format!("medal_token_1_{stale_ms}_ext");

        assert_eq!(service.verify(&plain), Err(TokenError::Expired));
        assert!(service.verify(&extended).is_ok());
    }
}
