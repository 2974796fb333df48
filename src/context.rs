//! Request-scoped context: correlation id plus the cancellation signal
//! every storage call is raced against. Created once per request by the
//! `request_context` middleware, passed explicitly to component calls.

use std::future::{Ready, ready};

use actix_web::body::MessageBody;
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            cancel: CancellationToken::new(),
        }
    }

    /// Resolves once the request has been abandoned by its caller.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FromRequest for RequestContext {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(req
            .extensions()
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default()))
    }
}

/// App-level middleware: attach a fresh context to the request. The drop
/// guard cancels the token if the connection is torn down before the
/// handler finishes, so in-flight storage waits observe the disconnect.
pub async fn request_context(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let ctx = RequestContext::new();
    let guard = ctx.cancel_token().drop_guard();

    req.extensions_mut().insert(ctx);
    let res = next.call(req).await;

    guard.disarm();
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_is_shared_across_clones() {
        let ctx = RequestContext::new();
        let token = ctx.cancel_token();
        ctx.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn drop_guard_cancels_unless_disarmed() {
        let ctx = RequestContext::new();
        {
            let _guard = ctx.cancel_token().drop_guard();
        }
        assert!(ctx.cancel_token().is_cancelled());

        let ctx = RequestContext::new();
        let guard = ctx.cancel_token().drop_guard();
        guard.disarm();
        assert!(!ctx.cancel_token().is_cancelled());
    }
}
