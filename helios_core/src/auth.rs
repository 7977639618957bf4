//! Per-vendor credential exchange and bearer-token caching.
//!
//! `AuthManager` makes authentication cheap and safe to call repeatedly:
//! the persisted token is the single source of truth, a safety buffer keeps
//! us off the expiry edge, and writes go through compare-and-swap so two
//! racing logins converge on one stored token.

use crate::adapter::VendorAdapter;
use crate::models::{VendorConfig, VendorToken, TOKEN_SAFETY_BUFFER};
use crate::store::TokenStore;
use crate::{Error, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Fallback validity when the vendor states neither an `expires_in` nor a
/// decodable token expiry. Short on purpose: better a spare login than a
/// rejected call mid-sync.
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

pub struct AuthManager {
    tokens: Arc<dyn TokenStore>,
    safety_buffer: Duration,
}

impl AuthManager {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            tokens,
            safety_buffer: TOKEN_SAFETY_BUFFER,
        }
    }

    /// Return a valid bearer token for `vendor`, logging in only on cache
    /// miss or expiry.
    #[tracing::instrument(level = "debug", skip(self, vendor, adapter), fields(vendor = %vendor.display_name))]
    pub async fn bearer_token(
        &self,
        vendor: &VendorConfig,
        adapter: &dyn VendorAdapter,
    ) -> Result<String> {
        let now = Utc::now();
        let cached = self.tokens.get_token(vendor.id).await?;
        if let Some(token) = &cached {
            if token.is_usable(now, self.safety_buffer) {
                tracing::debug!(vendor_id = %vendor.id, "reusing cached vendor token");
                return Ok(token.access_token.clone());
            }
        }

        let login = adapter.login(vendor).await?;
        let expires_at = resolve_expiry(&login.access_token, login.expires_in, now);
        let next = VendorToken::new(login.access_token, expires_at, login.refresh_token, now)?;

        let swapped = self
            .tokens
            .compare_and_swap_token(vendor.id, cached.as_ref(), &next)
            .await?;
        if swapped {
            tracing::info!(vendor_id = %vendor.id, expires_at = %next.expires_at, "stored fresh vendor token");
            return Ok(next.access_token);
        }

        // Lost the race: a concurrent login already stored a token. Both
        // logins succeeded, so the winner's token is valid; use it.
        tracing::debug!(vendor_id = %vendor.id, "lost token store race, reusing winner's token");
        let winner = self.tokens.get_token(vendor.id).await?.ok_or_else(|| {
            Error::AuthenticationFailed {
                vendor: vendor.display_name.clone(),
                status: None,
                message: "token vanished between compare-and-swap and re-read".to_string(),
            }
        })?;
        Ok(winner.access_token)
    }
}

/// Decide when a freshly-issued token expires.
///
/// Preference order: the token's own `exp` claim (when it has a three-part
/// base64-segmented shape), then the vendor's stated `expires_in`, then a
/// conservative default.
fn resolve_expiry(
    access_token: &str,
    expires_in: Option<Duration>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if let Some(exp) = decode_structured_expiry(access_token) {
        return exp;
    }
    let ttl = expires_in.unwrap_or(DEFAULT_TOKEN_TTL);
    now + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1))
}

/// Recover the `exp` claim from a structured (JWT-shaped) token, if any.
fn decode_structured_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (_header, payload, _sig) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::<Utc>::from_timestamp(exp, 0)
}
