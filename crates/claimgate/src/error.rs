//! Error types for key resolution, token handling, and request authorization.

use crate::keys::KeyFamily;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Unified error type for key material, token codec, and extraction failures.
///
/// Every failure is scoped to a single call or request; none are fatal to the
/// process. The HTTP middleware renders each variant into a 401 response and
/// keeps the per-variant message so failures stay distinguishable in logs.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// PEM content parsed as neither an RSA nor an ECDSA key.
    #[error("unknown key type")]
    UnknownKeyType,

    /// A key file could not be read.
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),

    /// The supplied key variant cannot perform the requested operation,
    /// e.g. signing with a public key.
    #[error("invalid key type for this operation")]
    InvalidKeyType,

    /// The token's self-declared algorithm belongs to a different family than
    /// the verification key. Checked before any signature math so a verifier
    /// never trusts the token's own header over the key it was handed.
    #[error("token algorithm {alg} does not match {family} key")]
    AlgorithmMismatch {
        /// Algorithm name declared in the token header.
        alg: String,
        /// Family of the verification key actually supplied.
        family: KeyFamily,
    },

    /// The signing operation itself failed while issuing a token.
    #[error("failed to sign token: {0}")]
    SigningFailed(String),

    /// Signature or structural failure during validation.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token string is not a decodable three-segment JWT.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Neither the Authorization header nor the `token` query parameter
    /// carried a candidate token.
    #[error("no token found in authorization header or query parameter")]
    MissingToken,

    /// The chosen header or query value split into an unexpected number of
    /// whitespace-separated fields.
    #[error("malformed authorization header: unexpected number of parts")]
    MalformedAuthHeader,

    /// The required claim is absent or not a string.
    #[error("claim {0:?} is missing or not a string")]
    ClaimMissingOrWrongType(String),

    /// The required claim is present but carries the wrong value.
    #[error("claim {0:?} has an unexpected value")]
    ClaimValueMismatch(String),
}
