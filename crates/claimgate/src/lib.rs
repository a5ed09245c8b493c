//! # claimgate - Signed claim tokens with claim-gating middleware
//!
//! Issues, transports, and verifies signed authentication tokens (compact
//! JWT form) carrying an arbitrary claim set, and provides tower middleware
//! that extracts those claims from incoming requests and enforces claim-based
//! authorization.
//!
//! ## Design principles
//!
//! - **Closed key dispatch**: the [`Key`] handle is a sealed sum over RSA,
//!   ECDSA, and symmetric variants; sign/verify sites match on it
//!   exhaustively, so the algorithm is always the one the key implies.
//! - **Confusion-proof verification**: a token's self-declared algorithm
//!   family is cross-checked against the verification key before any
//!   signature math, so a verifier never trusts the token's own header.
//! - **Stateless core**: no sessions, no key caching, no shared mutable
//!   state; key handles are immutable and safe to share across requests.
//!
//! ## Architecture
//!
//! - [`keys`] - PEM parsing and file loading into typed [`Key`] handles
//! - [`token`] - signing ([`create_token`]), verification
//!   ([`validate_token`]), and unverified decoding ([`unvalidated_claims`])
//! - [`extract`] - locating tokens in HTTP requests (Authorization header
//!   with free-form scheme prefix, `token` query-parameter fallback)
//! - [`middleware`] - tower layers gating a service on one required claim,
//!   inline or via a request-scoped claims carrier (feature `middleware`,
//!   enabled by default)
//!
//! ## Quick start
//!
//! ```rust
//! use claimgate::{create_token, validate_token, Claims, Key};
//!
//! let mut claims = Claims::new();
//! claims.insert("foo".to_string(), serde_json::json!("bar"));
//!
//! let key = Key::from_secret(b"secret".to_vec());
//! let token = create_token(&claims, &key).unwrap();
//! assert_eq!(validate_token(&token, &key).unwrap(), claims);
//! ```
//!
//! ## Algorithms
//!
//! One algorithm per key family, selected by the key variant alone:
//! HS512 for symmetric secrets, RS512 for RSA private keys, ES512 for ECDSA
//! private keys (P-521 curve). Nothing else is signed or accepted.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod extract;
pub mod keys;
#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod middleware;
pub mod token;

pub use error::{AuthError, Result};
pub use extract::{
    claims_from_request, token_from_request, validated_claims_from_request, QUERY_PREFIX,
};
pub use keys::{
    load_private_key, load_public_key, parse_private_key, parse_public_key, Key, KeyFamily,
};
pub use token::{create_token, unvalidated_claims, validate_token, Claims};
