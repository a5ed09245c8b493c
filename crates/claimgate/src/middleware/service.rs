//! Tower Service implementations for the claim-gating middleware.
//!
//! All validation is synchronous (immutable key handles, no I/O), so each
//! `call` decides the outcome before constructing its future: either a boxed
//! 401 response or the inner service's own future. The inner service is
//! cloned and swapped with `mem::replace` so the instance that was polled
//! ready is the one that gets called.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower_service::Service;
use tracing::{debug, warn};

use super::{RequiredClaim, ValidatedClaims};
use crate::extract::validated_claims_from_request;
use crate::keys::Key;

/// Build the plain-text 401 every failure path responds with.
fn unauthorized(reason: impl fmt::Display) -> Response {
    (StatusCode::UNAUTHORIZED, format!("not authorized: {reason}")).into_response()
}

/// Inline-check service: validate, check the required claim, then forward.
#[derive(Debug, Clone)]
pub struct RequireClaimService<S> {
    inner: S,
    key: Arc<Key>,
    required: RequiredClaim,
}

impl<S> RequireClaimService<S> {
    pub(super) fn new(inner: S, key: Arc<Key>, required: RequiredClaim) -> Self {
        Self {
            inner,
            key,
            required,
        }
    }
}

impl<S> Service<Request> for RequireClaimService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let inner_clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner_clone);

        let claims = match validated_claims_from_request(&req, &self.key) {
            Ok((_, claims)) => claims,
            Err(e) => {
                warn!(error = %e, "rejecting request: token validation failed");
                let response = unauthorized(format!("failed to validate token: {e}"));
                return Box::pin(async move { Ok(response) });
            }
        };

        if let Err(e) = self.required.check(&claims) {
            warn!(error = %e, "rejecting request: claim check failed");
            let response = unauthorized(e);
            return Box::pin(async move { Ok(response) });
        }

        Box::pin(async move { inner.call(req).await })
    }
}

/// Carrier stage one: validate and annotate the request, never reject.
///
/// On validation failure the request is forwarded without a carrier; a
/// downstream [`RequireContextClaimService`] then owns the rejection.
#[derive(Debug, Clone)]
pub struct AttachClaimsService<S> {
    inner: S,
    key: Arc<Key>,
}

impl<S> AttachClaimsService<S> {
    pub(super) fn new(inner: S, key: Arc<Key>) -> Self {
        Self { inner, key }
    }
}

impl<S> Service<Request> for AttachClaimsService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let inner_clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner_clone);

        match validated_claims_from_request(&req, &self.key) {
            Ok((prefix, claims)) => {
                req.extensions_mut().insert(ValidatedClaims { prefix, claims });
            }
            Err(e) => {
                debug!(error = %e, "token validation failed; forwarding without claims");
            }
        }

        Box::pin(async move { inner.call(req).await })
    }
}

/// Carrier stage two: enforce one required claim from the request context.
#[derive(Debug, Clone)]
pub struct RequireContextClaimService<S> {
    inner: S,
    required: RequiredClaim,
}

impl<S> RequireContextClaimService<S> {
    pub(super) fn new(inner: S, required: RequiredClaim) -> Self {
        Self { inner, required }
    }
}

impl<S> Service<Request> for RequireContextClaimService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let inner_clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner_clone);

        let outcome = match req.extensions().get::<ValidatedClaims>() {
            // Absent carrier: the attach stage never ran or failed upstream.
            None => {
                warn!("rejecting request: no claims in request context");
                Err(unauthorized("missing token from context"))
            }
            Some(carrier) => match self.required.check(&carrier.claims) {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!(error = %e, "rejecting request: claim check failed");
                    Err(unauthorized(e))
                }
            },
        };

        match outcome {
            Ok(()) => Box::pin(async move { inner.call(req).await }),
            Err(response) => Box::pin(async move { Ok(response) }),
        }
    }
}
