//! Token signing and verification.
//!
//! The codec is a pair of pure functions over a [`Key`] handle: the key's
//! variant selects the algorithm (RSA private -> RS512, ECDSA private ->
//! ES512, symmetric secret -> HS512) and verification independently
//! cross-checks the token's self-declared algorithm family against the
//! supplied key before any signature math runs. A token signed under one
//! family is never accepted by a key of another family, even if the raw
//! signature bytes would happen to verify.
//!
//! HS512 and RS512 ride on `jsonwebtoken`; ES512 is not in its algorithm
//! set, so that leg builds and verifies the compact segments directly with
//! P-521 ECDSA. JWS ECDSA signatures are the fixed-width `r || s`
//! concatenation (RFC 7518), not DER.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{EcdsaKeyPair, UnparsedPublicKey, ECDSA_P521_SHA512_FIXED};
use base64::alphabet::URL_SAFE;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, GeneralPurpose};
use base64::Engine as _;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::keys::{Key, KeyFamily};

/// The claim set carried inside a token: claim name to any JSON value.
///
/// No keys are reserved or injected; the payload round-trips exactly as the
/// issuer encoded it.
pub type Claims = serde_json::Map<String, serde_json::Value>;

const ES512: &str = "ES512";

// Expiry slack on the hand-rolled ES512 path, matching the default leeway
// the HS/RS verification path applies.
const LEEWAY_SECS: u64 = 60;

// Segments are emitted unpadded per RFC 7515, but some issuers pad, so
// decoding tolerates either.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The protected header of a compact token.
///
/// Parsed from the raw segment rather than through the JWT engine so that
/// `ES512` (outside the engine's algorithm set) still classifies for the
/// family cross-check.
#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    alg: String,
}

/// The algorithm family a token header declares, if it is one we accept.
///
/// `PS*` and `EdDSA` deliberately map to no family: the codec never signs
/// with them, so a verifier must not accept them either.
fn header_family(alg: &str) -> Option<KeyFamily> {
    match alg {
        "HS256" | "HS384" | "HS512" => Some(KeyFamily::Hmac),
        "RS256" | "RS384" | "RS512" => Some(KeyFamily::Rsa),
        "ES256" | "ES384" | "ES512" => Some(KeyFamily::Ecdsa),
        _ => None,
    }
}

/// The subset of header algorithms the JWT engine verifies for us.
fn engine_algorithm(alg: &str) -> Option<Algorithm> {
    match alg {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        "RS256" => Some(Algorithm::RS256),
        "RS384" => Some(Algorithm::RS384),
        "RS512" => Some(Algorithm::RS512),
        _ => None,
    }
}

/// Sign a claim set into a compact token.
///
/// The algorithm is dispatched strictly on the key variant; verification-only
/// variants (public keys) fail with [`AuthError::InvalidKeyType`].
///
/// # Errors
///
/// [`AuthError::InvalidKeyType`] for a non-signing key,
/// [`AuthError::SigningFailed`] if the signing operation itself fails.
pub fn create_token(claims: &Claims, key: &Key) -> Result<String> {
    match key {
        Key::RsaPrivate(k) => encode(&Header::new(Algorithm::RS512), claims, k)
            .map_err(|e| AuthError::SigningFailed(e.to_string())),
        Key::EcPrivate(pair) => sign_es512(claims, pair),
        Key::Secret(secret) => encode(
            &Header::new(Algorithm::HS512),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| AuthError::SigningFailed(e.to_string())),
        Key::RsaPublic(_) | Key::EcPublic(_) => Err(AuthError::InvalidKeyType),
    }
}

fn sign_es512(claims: &Claims, pair: &EcdsaKeyPair) -> Result<String> {
    let header = TokenHeader {
        typ: Some("JWT".to_string()),
        alg: ES512.to_string(),
    };
    let header_json =
        serde_json::to_vec(&header).map_err(|e| AuthError::SigningFailed(e.to_string()))?;
    let payload_json =
        serde_json::to_vec(claims).map_err(|e| AuthError::SigningFailed(e.to_string()))?;
    let signing_input = format!(
        "{}.{}",
        BASE64URL.encode(header_json),
        BASE64URL.encode(payload_json)
    );

    let rng = SystemRandom::new();
    let signature = pair
        .sign(&rng, signing_input.as_bytes())
        .map_err(|_| AuthError::SigningFailed("ECDSA signing failed".to_string()))?;
    Ok(format!(
        "{signing_input}.{}",
        BASE64URL.encode(signature.as_ref())
    ))
}

/// Verify a token's signature and return its claims.
///
/// The token's declared header algorithm must belong to the same family as
/// `key`; a mismatch fails with [`AuthError::AlgorithmMismatch`] before any
/// cryptographic verification is attempted. Structural or signature failures
/// fail with [`AuthError::InvalidToken`]. On success the decoded claims are
/// returned exactly as encoded.
///
/// # Errors
///
/// [`AuthError::AlgorithmMismatch`], [`AuthError::InvalidToken`], or
/// [`AuthError::InvalidKeyType`] when handed a signing-only private key.
pub fn validate_token(token: &str, key: &Key) -> Result<Claims> {
    let header = decode_token_header(token)?;

    let family = key.family();
    if header_family(&header.alg) != Some(family) {
        debug!(alg = %header.alg, key_family = %family, "token algorithm family mismatch");
        return Err(AuthError::AlgorithmMismatch {
            alg: header.alg,
            family,
        });
    }

    match key {
        Key::RsaPublic(k) => decode_claims(token, k, &header.alg),
        Key::Secret(secret) => decode_claims(token, &DecodingKey::from_secret(secret), &header.alg),
        Key::EcPublic(point) => verify_es512(token, point, &header.alg),
        Key::RsaPrivate(_) | Key::EcPrivate(_) => Err(AuthError::InvalidKeyType),
    }
}

fn decode_token_header(token: &str) -> Result<TokenHeader> {
    let segment = token.split('.').next().unwrap_or_default();
    let bytes = BASE64URL.decode(segment).map_err(|e| {
        debug!(error = %e, "failed to decode token header");
        AuthError::InvalidToken(format!("header is not valid base64url: {e}"))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        debug!(error = %e, "failed to decode token header");
        AuthError::InvalidToken(format!("header is not valid JSON: {e}"))
    })
}

/// HS/RS verification through the JWT engine.
fn decode_claims(token: &str, key: &DecodingKey, alg: &str) -> Result<Claims> {
    let alg = engine_algorithm(alg)
        .ok_or_else(|| AuthError::InvalidToken(format!("unsupported algorithm {alg}")))?;

    let mut validation = Validation::new(alg);
    // Arbitrary claim sets: nothing is required, audience is not checked,
    // exp is still enforced when the issuer chose to include it.
    validation.required_spec_claims = HashSet::new();
    validation.validate_aud = false;

    let data = decode::<Claims>(token, key, &validation).map_err(|e| {
        debug!(error = %e, "token verification failed");
        AuthError::InvalidToken(e.to_string())
    })?;
    Ok(data.claims)
}

/// ES512 verification over the raw compact segments.
fn verify_es512(token: &str, public_point: &[u8], alg: &str) -> Result<Claims> {
    // Only P-521 keys are resolved, so ES256/ES384 can never verify here.
    if alg != ES512 {
        return Err(AuthError::InvalidToken(format!(
            "unsupported ECDSA algorithm {alg}"
        )));
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidToken(
            "token contains an invalid number of segments".to_string(),
        ));
    }
    let signature = BASE64URL
        .decode(parts[2])
        .map_err(|e| AuthError::InvalidToken(format!("signature is not valid base64url: {e}")))?;

    let signing_input = &token.as_bytes()[..parts[0].len() + 1 + parts[1].len()];
    UnparsedPublicKey::new(&ECDSA_P521_SHA512_FIXED, public_point)
        .verify(signing_input, &signature)
        .map_err(|_| {
            debug!("token verification failed");
            AuthError::InvalidToken("ECDSA signature verification failed".to_string())
        })?;

    let payload = BASE64URL
        .decode(parts[1])
        .map_err(|e| AuthError::InvalidToken(format!("payload is not valid base64url: {e}")))?;
    let claims: Claims = serde_json::from_slice(&payload)
        .map_err(|e| AuthError::InvalidToken(format!("payload is not valid JSON: {e}")))?;
    check_expiry(&claims)?;
    Ok(claims)
}

fn check_expiry(claims: &Claims) -> Result<()> {
    let Some(exp) = claims.get("exp").and_then(serde_json::Value::as_u64) else {
        return Ok(());
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    if exp + LEEWAY_SECS < now {
        return Err(AuthError::InvalidToken("token has expired".to_string()));
    }
    Ok(())
}

/// Decode a token's claims without verifying its signature.
///
/// Splits the compact form, requires exactly three segments, and JSON-decodes
/// the payload. No signature check is performed: callers are responsible for
/// establishing trust out-of-band, and must not feed the result into an
/// authorization decision.
///
/// # Errors
///
/// [`AuthError::MalformedToken`] for a wrong segment count, undecodable
/// base64url, or a payload that is not a JSON object.
pub fn unvalidated_claims(token: &str) -> Result<Claims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::MalformedToken(
            "token contains an invalid number of segments".to_string(),
        ));
    }

    let payload = BASE64URL
        .decode(parts[1])
        .map_err(|e| AuthError::MalformedToken(format!("payload is not valid base64url: {e}")))?;

    serde_json::from_slice(&payload)
        .map_err(|e| AuthError::MalformedToken(format!("payload is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(pairs: &[(&str, &str)]) -> Claims {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), json!(v)))
            .collect()
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn hmac_round_trip() {
        let claims = claims(&[("foo", "bar")]);
        let key = Key::from_secret(b"secret".to_vec());
        let token = create_token(&claims, &key).unwrap();
        assert!(!token.is_empty());
        assert_eq!(validate_token(&token, &key).unwrap(), claims);
    }

    #[test]
    fn signing_with_public_key_is_rejected() {
        let pub_key =
            crate::keys::parse_public_key(include_bytes!("../tests/fixtures/rsa_public.pem"))
                .unwrap();
        let err = create_token(&claims(&[("foo", "bar")]), &pub_key).unwrap_err();
        assert!(matches!(err, AuthError::InvalidKeyType));
    }

    #[test]
    fn validating_with_private_key_is_rejected() {
        let claims = claims(&[("foo", "bar")]);
        let priv_key =
            crate::keys::parse_private_key(include_bytes!("../tests/fixtures/rsa_private.pem"))
                .unwrap();
        let token = create_token(&claims, &priv_key).unwrap();
        let err = validate_token(&token, &priv_key).unwrap_err();
        assert!(matches!(err, AuthError::InvalidKeyType));
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let claims = claims(&[("foo", "bar")]);
        let token = create_token(&claims, &Key::from_secret(b"secret".to_vec())).unwrap();
        let err = validate_token(&token, &Key::from_secret(b"other".to_vec())).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn hmac_token_against_rsa_key_is_a_family_mismatch() {
        let claims = claims(&[("foo", "bar")]);
        let token = create_token(&claims, &Key::from_secret(b"secret".to_vec())).unwrap();
        let pub_key =
            crate::keys::parse_public_key(include_bytes!("../tests/fixtures/rsa_public.pem"))
                .unwrap();
        let err = validate_token(&token, &pub_key).unwrap_err();
        assert!(matches!(err, AuthError::AlgorithmMismatch { .. }));
    }

    #[test]
    fn unsupported_ecdsa_curve_algorithms_are_rejected() {
        // An ES256 header passes the family check against an ECDSA key but
        // cannot verify against the P-521 material we resolve.
        let header = BASE64URL.encode(br#"{"typ":"JWT","alg":"ES256"}"#);
        let payload = BASE64URL.encode(br#"{"foo":"bar"}"#);
        let token = format!("{header}.{payload}.AAAA");

        let ec_pub =
            crate::keys::parse_public_key(include_bytes!("../tests/fixtures/ec_public.pem"))
                .unwrap();
        let err = validate_token(&token, &ec_pub).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)), "{err:?}");

        let rsa_pub =
            crate::keys::parse_public_key(include_bytes!("../tests/fixtures/rsa_public.pem"))
                .unwrap();
        let err = validate_token(&token, &rsa_pub).unwrap_err();
        assert!(
            matches!(err, AuthError::AlgorithmMismatch { ref alg, .. } if alg.as_str() == "ES256"),
            "{err:?}"
        );
    }

    #[test]
    fn expired_hmac_token_is_rejected() {
        let mut claims = Claims::new();
        claims.insert("foo".to_string(), json!("bar"));
        claims.insert("exp".to_string(), json!(now_secs() - 3600));
        let key = Key::from_secret(b"secret".to_vec());
        let token = create_token(&claims, &key).unwrap();
        let err = validate_token(&token, &key).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn expired_ecdsa_token_is_rejected() {
        let priv_key =
            crate::keys::parse_private_key(include_bytes!("../tests/fixtures/ec_private.pem"))
                .unwrap();
        let pub_key =
            crate::keys::parse_public_key(include_bytes!("../tests/fixtures/ec_public.pem"))
                .unwrap();

        let mut claims = Claims::new();
        claims.insert("exp".to_string(), json!(now_secs() - 3600));
        let token = create_token(&claims, &priv_key).unwrap();
        let err = validate_token(&token, &pub_key).unwrap_err();
        assert!(
            matches!(err, AuthError::InvalidToken(ref msg) if msg.contains("expired")),
            "{err:?}"
        );

        let mut claims = Claims::new();
        claims.insert("exp".to_string(), json!(now_secs() + 3600));
        let token = create_token(&claims, &priv_key).unwrap();
        assert!(validate_token(&token, &pub_key).is_ok());
    }

    #[test]
    fn unvalidated_claims_round_trip() {
        let claims = claims(&[("foo", "bar"), ("scope", "read")]);
        let token = create_token(&claims, &Key::from_secret(b"secret".to_vec())).unwrap();
        assert_eq!(unvalidated_claims(&token).unwrap(), claims);
    }

    #[test]
    fn unvalidated_claims_requires_three_segments() {
        for bad in ["", "a", "a.b", "a.b.c.d"] {
            let err = unvalidated_claims(bad).unwrap_err();
            assert!(matches!(err, AuthError::MalformedToken(_)), "input {bad:?}");
        }
    }

    #[test]
    fn unvalidated_claims_rejects_bad_base64() {
        let err = unvalidated_claims("aaa.!!!.ccc").unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[test]
    fn unvalidated_claims_accepts_padded_payload() {
        let claims = claims(&[("foo", "bar")]);
        let token = create_token(&claims, &Key::from_secret(b"secret".to_vec())).unwrap();

        // Some issuers pad their base64url segments; re-pad ours.
        let parts: Vec<&str> = token.split('.').collect();
        let mut payload = parts[1].to_string();
        while payload.len() % 4 != 0 {
            payload.push('=');
        }
        let padded = format!("{}.{payload}.{}", parts[0], parts[2]);

        assert_eq!(unvalidated_claims(&padded).unwrap(), claims);
    }

    #[test]
    fn nested_claim_values_survive() {
        let mut claims = Claims::new();
        claims.insert("n".to_string(), json!(42));
        claims.insert("ok".to_string(), json!(true));
        claims.insert("nested".to_string(), json!({"a": ["b", "c"]}));
        let key = Key::from_secret(b"secret".to_vec());
        let token = create_token(&claims, &key).unwrap();
        assert_eq!(validate_token(&token, &key).unwrap(), claims);
    }
}
