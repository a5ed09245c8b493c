//! Tower Layer implementations for the claim-gating middleware.

use std::sync::Arc;

use tower::Layer;

use super::service::{AttachClaimsService, RequireClaimService, RequireContextClaimService};
use super::RequiredClaim;
use crate::keys::Key;

/// Inline-check variant: validate the request token and gate the inner
/// service on one required claim, in a single stage.
#[derive(Debug, Clone)]
pub struct RequireClaimLayer {
    key: Arc<Key>,
    required: RequiredClaim,
}

impl RequireClaimLayer {
    /// Gate requests on `required`, validating tokens against `key`.
    pub fn new(key: Arc<Key>, required: RequiredClaim) -> Self {
        Self { key, required }
    }
}

impl<S> Layer<S> for RequireClaimLayer {
    type Service = RequireClaimService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireClaimService::new(inner, Arc::clone(&self.key), self.required.clone())
    }
}

/// First stage of the context-carrier variant: validates the request token
/// and stores the claims in the request's extensions, then always forwards.
#[derive(Debug, Clone)]
pub struct AttachClaimsLayer {
    key: Arc<Key>,
}

impl AttachClaimsLayer {
    /// Validate tokens against `key` and annotate requests with their claims.
    pub fn new(key: Arc<Key>) -> Self {
        Self { key }
    }
}

impl<S> Layer<S> for AttachClaimsLayer {
    type Service = AttachClaimsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AttachClaimsService::new(inner, Arc::clone(&self.key))
    }
}

/// Second stage of the context-carrier variant: reads the claims carrier left
/// by [`AttachClaimsLayer`] and enforces one required claim. May be composed
/// several times in a chain, each stage with its own requirement.
#[derive(Debug, Clone)]
pub struct RequireContextClaimLayer {
    required: RequiredClaim,
}

impl RequireContextClaimLayer {
    /// Gate requests on `required`, reading claims from the request context.
    pub fn new(required: RequiredClaim) -> Self {
        Self { required }
    }
}

impl<S> Layer<S> for RequireContextClaimLayer {
    type Service = RequireContextClaimService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireContextClaimService::new(inner, self.required.clone())
    }
}
