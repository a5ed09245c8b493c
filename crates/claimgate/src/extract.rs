//! Token extraction from HTTP requests.
//!
//! Locates a candidate token in the `Authorization` header (first value only)
//! or, when no header is present, in the `token` query parameter. The chosen
//! raw value is split on whitespace to separate an optional scheme prefix
//! ("Bearer", "Token", or any other string) from the token body.

use http::header::AUTHORIZATION;
use http::Request;

use crate::error::{AuthError, Result};
use crate::keys::Key;
use crate::token::{self, Claims};

/// Prefix reported for tokens pulled from the `token` query parameter, in
/// place of a parsed scheme prefix.
pub const QUERY_PREFIX: &str = "GET";

/// Locate the token in a request, returning `(prefix, token)`.
///
/// The first `Authorization` header value wins; the query parameter is only
/// consulted when the header is absent, and then the prefix is preset to
/// [`QUERY_PREFIX`]. The selected raw value is split on whitespace: one field
/// is a bare token, two fields are prefix plus token, anything else fails
/// with [`AuthError::MalformedAuthHeader`].
///
/// # Errors
///
/// [`AuthError::MissingToken`] when neither source carries a candidate,
/// [`AuthError::MalformedAuthHeader`] for a non-UTF-8 header value or an
/// unexpected field count.
pub fn token_from_request<B>(req: &Request<B>) -> Result<(String, String)> {
    let mut prefix = String::new();

    let raw = match req.headers().get(AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .map_err(|_| AuthError::MalformedAuthHeader)?
            .to_string(),
        None => {
            // No header: fall back to the `token` query parameter.
            prefix = QUERY_PREFIX.to_string();
            query_token(req).ok_or(AuthError::MissingToken)?
        }
    };

    let fields: Vec<&str> = raw.split_whitespace().collect();
    match fields.as_slice() {
        [token] => Ok((prefix, (*token).to_string())),
        [scheme, token] => Ok(((*scheme).to_string(), (*token).to_string())),
        _ => Err(AuthError::MalformedAuthHeader),
    }
}

/// Extract and validate the token from a request, returning the prefix and
/// the verified claims. Errors from the locator and from
/// [`token::validate_token`] are propagated unchanged.
pub fn validated_claims_from_request<B>(
    req: &Request<B>,
    key: &Key,
) -> Result<(String, Claims)> {
    let (prefix, token) = token_from_request(req)?;
    let claims = token::validate_token(&token, key)?;
    Ok((prefix, claims))
}

/// Extract the token from a request and decode its claims **without**
/// validating the signature.
///
/// Only for contexts where trust is already established, or for logging;
/// callers must not use the result for authorization decisions.
pub fn claims_from_request<B>(req: &Request<B>) -> Result<(String, Claims)> {
    let (prefix, token) = token_from_request(req)?;
    let claims = token::unvalidated_claims(&token)?;
    Ok((prefix, claims))
}

/// First `token` query parameter value, if any.
fn query_token<B>(req: &Request<B>) -> Option<String> {
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == "token")
        .map(|(_, value)| value.into_owned())
}
