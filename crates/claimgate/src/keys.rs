//! Key material resolution.
//!
//! Parses PEM-encoded bytes into a typed [`Key`] handle and classifies the
//! key so the token codec can select the matching algorithm. Public keys are
//! accepted either as bare `PUBLIC KEY` blocks or wrapped in a PEM
//! `CERTIFICATE`, in which case the subject public key is extracted first.
//! ECDSA keys sign and verify ES512 and therefore must be on the P-521 curve.
//!
//! Key handles are immutable once constructed and safe to share across any
//! number of concurrent verifications.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use aws_lc_rs::signature::{EcdsaKeyPair, ECDSA_P521_SHA512_FIXED_SIGNING};
use jsonwebtoken::{DecodingKey, EncodingKey};
use x509_parser::oid_registry::OID_KEY_TYPE_EC_PUBLIC_KEY;
use x509_parser::prelude::FromDer;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::error::{AuthError, Result};

/// The algorithm family a key belongs to.
///
/// The family fully determines the signing/verification algorithm: RSA keys
/// sign RS512, ECDSA keys sign ES512, symmetric secrets sign HS512.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// RSA public or private key (RS512).
    Rsa,
    /// ECDSA public or private key (ES512).
    Ecdsa,
    /// Symmetric HMAC secret (HS512).
    Hmac,
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyFamily::Rsa => f.write_str("RSA"),
            KeyFamily::Ecdsa => f.write_str("ECDSA"),
            KeyFamily::Hmac => f.write_str("HMAC"),
        }
    }
}

/// A typed key handle.
///
/// The variant tag is the single source of truth for which algorithm applies;
/// the codec matches on it exhaustively, so adding an algorithm is a
/// compile-time-checked exercise rather than a fall-through to a default
/// "invalid key" branch.
#[derive(Clone)]
pub enum Key {
    /// RSA public key, usable for verification only.
    RsaPublic(DecodingKey),
    /// RSA private key, usable for signing only.
    RsaPrivate(EncodingKey),
    /// ECDSA public key as an uncompressed curve point, verification only.
    EcPublic(Vec<u8>),
    /// ECDSA P-521 private key, usable for signing only.
    EcPrivate(Arc<EcdsaKeyPair>),
    /// Raw symmetric secret, usable for both signing and verification.
    Secret(Vec<u8>),
}

impl Key {
    /// Wrap a raw symmetric secret.
    pub fn from_secret(secret: impl Into<Vec<u8>>) -> Self {
        Key::Secret(secret.into())
    }

    /// The algorithm family implied by this handle's variant.
    pub fn family(&self) -> KeyFamily {
        match self {
            Key::RsaPublic(_) | Key::RsaPrivate(_) => KeyFamily::Rsa,
            Key::EcPublic(_) | Key::EcPrivate(_) => KeyFamily::Ecdsa,
            Key::Secret(_) => KeyFamily::Hmac,
        }
    }

    /// Whether this handle can produce signatures.
    pub fn is_signing_key(&self) -> bool {
        matches!(
            self,
            Key::RsaPrivate(_) | Key::EcPrivate(_) | Key::Secret(_)
        )
    }
}

// The wrapped key types carry no useful Debug output; show the variant only.
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Key::RsaPublic(_) => "RsaPublic",
            Key::RsaPrivate(_) => "RsaPrivate",
            Key::EcPublic(_) => "EcPublic",
            Key::EcPrivate(_) => "EcPrivate",
            Key::Secret(_) => "Secret",
        };
        f.debug_tuple(variant).finish()
    }
}

/// Parse a PEM-encoded public key (RSA or ECDSA).
///
/// Accepts bare `PUBLIC KEY` blocks as well as PEM `CERTIFICATE` blocks, from
/// which the subject public key is extracted. Attempts an RSA parse first and
/// falls back to ECDSA; if neither succeeds the content is not a recognized
/// key and [`AuthError::UnknownKeyType`] is returned.
pub fn parse_public_key(data: &[u8]) -> Result<Key> {
    let data = match certificate_public_key_pem(data) {
        Some(spki_pem) => Cow::Owned(spki_pem),
        None => Cow::Borrowed(data),
    };
    if let Ok(key) = DecodingKey::from_rsa_pem(&data) {
        return Ok(Key::RsaPublic(key));
    }
    if let Some(point) = ec_public_point(&data) {
        return Ok(Key::EcPublic(point));
    }
    Err(AuthError::UnknownKeyType)
}

/// Parse a PEM-encoded private key (RSA or ECDSA).
///
/// Same ordered fallback as [`parse_public_key`]: RSA first, then ECDSA,
/// otherwise [`AuthError::UnknownKeyType`]. ECDSA private keys are accepted
/// as PKCS#8 `PRIVATE KEY` or SEC1 `EC PRIVATE KEY` blocks and must be on
/// P-521; other curves cannot sign ES512 and are rejected.
pub fn parse_private_key(data: &[u8]) -> Result<Key> {
    if let Ok(key) = EncodingKey::from_rsa_pem(data) {
        return Ok(Key::RsaPrivate(key));
    }
    if let Some(pair) = ec_key_pair(data) {
        return Ok(Key::EcPrivate(Arc::new(pair)));
    }
    Err(AuthError::UnknownKeyType)
}

/// Load and parse a PEM-encoded public key file.
///
/// # Errors
///
/// [`AuthError::Io`] if the file is missing or unreadable,
/// [`AuthError::UnknownKeyType`] if its content is not a recognized key.
pub fn load_public_key(path: impl AsRef<Path>) -> Result<Key> {
    let bytes = std::fs::read(path)?;
    parse_public_key(&bytes)
}

/// Load and parse a PEM-encoded private key file.
///
/// # Errors
///
/// [`AuthError::Io`] if the file is missing or unreadable,
/// [`AuthError::UnknownKeyType`] if its content is not a recognized key.
pub fn load_private_key(path: impl AsRef<Path>) -> Result<Key> {
    let bytes = std::fs::read(path)?;
    parse_private_key(&bytes)
}

/// If `data` is a PEM `CERTIFICATE`, return its SubjectPublicKeyInfo
/// re-encoded as a `PUBLIC KEY` PEM block; otherwise `None`.
///
/// The key parsers only understand key PEM blocks, so certificate-wrapped
/// public keys are unwrapped here before classification.
fn certificate_public_key_pem(data: &[u8]) -> Option<Vec<u8>> {
    let (_, parsed) = x509_parser::pem::parse_x509_pem(data).ok()?;
    if parsed.label != "CERTIFICATE" {
        return None;
    }
    let cert = parsed.parse_x509().ok()?;
    let spki_der = cert.public_key().raw.to_vec();
    let block = pem::Pem::new("PUBLIC KEY", spki_der);
    Some(pem::encode(&block).into_bytes())
}

/// Extract the uncompressed curve point from an EC `PUBLIC KEY` SPKI block.
fn ec_public_point(data: &[u8]) -> Option<Vec<u8>> {
    let block = pem::parse(data).ok()?;
    if block.tag() != "PUBLIC KEY" {
        return None;
    }
    let (_, spki) = SubjectPublicKeyInfo::from_der(block.contents()).ok()?;
    if spki.algorithm.algorithm != OID_KEY_TYPE_EC_PUBLIC_KEY {
        return None;
    }
    Some(spki.subject_public_key.data.to_vec())
}

fn ec_key_pair(data: &[u8]) -> Option<EcdsaKeyPair> {
    let block = pem::parse(data).ok()?;
    match block.tag() {
        "PRIVATE KEY" => {
            EcdsaKeyPair::from_pkcs8(&ECDSA_P521_SHA512_FIXED_SIGNING, block.contents()).ok()
        }
        "EC PRIVATE KEY" => {
            EcdsaKeyPair::from_private_key_der(&ECDSA_P521_SHA512_FIXED_SIGNING, block.contents())
                .ok()
        }
        _ => None,
    }
}
