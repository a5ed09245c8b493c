//! Key-file loading paths: well-formed keys, missing files, non-key content.

use claimgate::{load_private_key, load_public_key, AuthError, Key, KeyFamily};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn loads_rsa_keys_from_files() {
    let private = load_private_key(fixture("rsa_private.pem")).unwrap();
    assert!(matches!(private, Key::RsaPrivate(_)));
    assert_eq!(private.family(), KeyFamily::Rsa);

    let public = load_public_key(fixture("rsa_public.pem")).unwrap();
    assert!(matches!(public, Key::RsaPublic(_)));
    assert_eq!(public.family(), KeyFamily::Rsa);
}

#[test]
fn loads_ecdsa_keys_from_files() {
    let private = load_private_key(fixture("ec_private.pem")).unwrap();
    assert!(matches!(private, Key::EcPrivate(_)));
    assert_eq!(private.family(), KeyFamily::Ecdsa);

    let public = load_public_key(fixture("ec_public.pem")).unwrap();
    assert!(matches!(public, Key::EcPublic(_)));
    assert_eq!(public.family(), KeyFamily::Ecdsa);
}

#[test]
fn loads_certificate_wrapped_public_keys_from_files() {
    let public = load_public_key(fixture("rsa_cert.pem")).unwrap();
    assert!(matches!(public, Key::RsaPublic(_)));

    let public = load_public_key(fixture("ec_cert.pem")).unwrap();
    assert!(matches!(public, Key::EcPublic(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_private_key(fixture("not-here.pem")).unwrap_err();
    assert!(matches!(err, AuthError::Io(_)));

    let err = load_public_key(fixture("not-here.pem")).unwrap_err();
    assert!(matches!(err, AuthError::Io(_)));
}

#[test]
fn non_key_file_is_an_unknown_key_type() {
    let err = load_private_key(fixture("not_a_key.txt")).unwrap_err();
    assert!(matches!(err, AuthError::UnknownKeyType));

    let err = load_public_key(fixture("not_a_key.txt")).unwrap_err();
    assert!(matches!(err, AuthError::UnknownKeyType));
}
