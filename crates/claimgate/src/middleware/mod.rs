//! Tower middleware for claim-gated request handling.
//!
//! Two deployment variants with the same security contract:
//!
//! - **Inline check** — [`RequireClaimLayer`] validates the request token and
//!   gates the inner service on one required claim key/value pair, all in a
//!   single stage.
//! - **Context carrier** — [`AttachClaimsLayer`] validates once and stores
//!   the claims in the request's extensions; one or more
//!   [`RequireContextClaimLayer`] stages later in the chain read the carrier
//!   and enforce their own claim, without re-validating the token.
//!
//! Every authentication or authorization failure short-circuits with a 401
//! response whose plain-text body starts with `not authorized: `, keeping a
//! distinct message per failure kind.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use claimgate::middleware::{RequireClaimLayer, RequiredClaim};
//!
//! let app = axum::Router::new()
//!     .route("/admin", axum::routing::get(handler))
//!     .layer(RequireClaimLayer::new(
//!         Arc::new(key),
//!         RequiredClaim::new("role", "admin"),
//!     ));
//! ```

mod layer;
mod service;

pub use layer::{AttachClaimsLayer, RequireClaimLayer, RequireContextClaimLayer};
pub use service::{AttachClaimsService, RequireClaimService, RequireContextClaimService};

use crate::error::AuthError;
use crate::token::Claims;

/// One required claim key/value pair, bound at server-wiring time.
///
/// Created once when the middleware stack is assembled and never mutated
/// afterwards; the layers close over it.
#[derive(Debug, Clone)]
pub struct RequiredClaim {
    key: String,
    value: String,
}

impl RequiredClaim {
    /// Require `claims[key]` to be the string `value`.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Check a claim set against this requirement.
    ///
    /// # Errors
    ///
    /// [`AuthError::ClaimMissingOrWrongType`] when the claim is absent or not
    /// a string, [`AuthError::ClaimValueMismatch`] when its value differs.
    pub fn check(&self, claims: &Claims) -> Result<(), AuthError> {
        match claims.get(&self.key) {
            Some(serde_json::Value::String(v)) if *v == self.value => Ok(()),
            Some(serde_json::Value::String(_)) => {
                Err(AuthError::ClaimValueMismatch(self.key.clone()))
            }
            _ => Err(AuthError::ClaimMissingOrWrongType(self.key.clone())),
        }
    }
}

/// Request-scoped claims carrier.
///
/// Inserted into the request's extensions by [`AttachClaimsService`] after
/// successful validation and read by [`RequireContextClaimService`] stages in
/// the same request's pipeline. Lives and dies with one in-flight request.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    /// Scheme prefix reported by the extractor ("Bearer", "Token", the query
    /// sentinel, or empty).
    pub prefix: String,
    /// The verified claim set.
    pub claims: Claims,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(key: &str, value: serde_json::Value) -> Claims {
        let mut c = Claims::new();
        c.insert(key.to_string(), value);
        c
    }

    #[test]
    fn matching_claim_passes() {
        let required = RequiredClaim::new("role", "admin");
        assert!(required.check(&claims("role", json!("admin"))).is_ok());
    }

    #[test]
    fn wrong_value_is_a_mismatch() {
        let required = RequiredClaim::new("role", "admin");
        let err = required.check(&claims("role", json!("user"))).unwrap_err();
        assert!(matches!(err, AuthError::ClaimValueMismatch(_)));
    }

    #[test]
    fn missing_claim_and_non_string_are_the_same_kind() {
        let required = RequiredClaim::new("role", "admin");
        let err = required.check(&Claims::new()).unwrap_err();
        assert!(matches!(err, AuthError::ClaimMissingOrWrongType(_)));

        let err = required.check(&claims("role", json!(42))).unwrap_err();
        assert!(matches!(err, AuthError::ClaimMissingOrWrongType(_)));
    }
}
