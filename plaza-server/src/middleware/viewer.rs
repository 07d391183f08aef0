//! Viewer resolution middleware.
//!
//! Identity is an external collaborator: something upstream (the magic-link
//! auth service and its proxy) has already verified credentials by the time a
//! request reaches this core. The [`IdentityProvider`] seam adapts whatever
//! that upstream exposes into an optional [`Identity`], attached to every
//! request as a [`ViewerContext`] extension. Resolution never fails a
//! request; an unrecognized caller is simply anonymous.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use plaza_shared::Identity;

/// Resolves the viewer behind a request, if any.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated viewer for these request headers, or `None`.
    async fn current_viewer(&self, headers: &HeaderMap) -> Option<Identity>;
}

/// Identity provider trusting headers injected by the fronting auth proxy.
///
/// The proxy strips any inbound `x-plaza-user-*` headers and sets them only
/// after verifying the session, so their presence here is authoritative.
#[derive(Debug, Default, Clone)]
pub struct TrustedHeaderProvider;

/// Header carrying the verified user id.
pub const USER_ID_HEADER: &str = "x-plaza-user-id";
/// Header carrying the verified user email.
pub const USER_EMAIL_HEADER: &str = "x-plaza-user-email";

#[async_trait]
impl IdentityProvider for TrustedHeaderProvider {
    async fn current_viewer(&self, headers: &HeaderMap) -> Option<Identity> {
        let id = headers
            .get(USER_ID_HEADER)?
            .to_str()
            .ok()?
            .parse::<i64>()
            .ok()?;
        let email = headers.get(USER_EMAIL_HEADER)?.to_str().ok()?.to_string();
        Some(Identity { id, email })
    }
}

/// Optional viewer attached to each request.
#[derive(Debug, Clone)]
pub struct ViewerContext(pub Option<Identity>);

/// Middleware attaching the resolved [`ViewerContext`] to the request.
pub async fn attach_viewer(
    State(provider): State<Arc<dyn IdentityProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    let viewer = provider.current_viewer(request.headers()).await;
    request.extensions_mut().insert(ViewerContext(viewer));
    next.run(request).await
}
