//! Webhook signature middleware for Actix Web.
//!
//! The payment provider signs every webhook and sends the lowercase hex digest in the `Sign` header. This middleware
//! reads the body, decodes it according to its content type and checks the claimed signature against every canonical
//! form the provider is known to sign (see [`SignatureReconciler`]).
//!
//! Requests without a `Sign` header are rejected before the body is read. Verified payloads are stored in the request
//! extensions, where the handler picks them up with `web::ReqData<WebhookPayload>`.
use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::CONTENT_TYPE,
    Error,
    HttpMessage,
};
use bytes::Bytes;
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use storefront_engine::helpers::{SignatureError, SignatureReconciler, WebhookPayload};

use crate::errors::ServerError;

pub const SIGNATURE_HEADER: &str = "Sign";

pub struct SignatureMiddlewareFactory {
    reconciler: Option<Arc<SignatureReconciler>>,
}

impl SignatureMiddlewareFactory {
    /// Without a reconciler (no secret key configured), every webhook is rejected.
    pub fn new(reconciler: Option<Arc<SignatureReconciler>>) -> Self {
        SignatureMiddlewareFactory { reconciler }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureMiddlewareService { reconciler: self.reconciler.clone(), service: Rc::new(service) }))
    }
}

pub struct SignatureMiddlewareService<S> {
    reconciler: Option<Arc<SignatureReconciler>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let reconciler = self.reconciler.clone();
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature");
            let claimed = req
                .headers()
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    warn!("🔐️ Webhook arrived without a signature. Rejecting.");
                    ServerError::from(SignatureError::MissingSignature)
                })?;
            let reconciler = reconciler.ok_or_else(|| {
                warn!("🔐️ Webhook arrived, but no payment secret key is configured. Rejecting.");
                ServerError::from(SignatureError::NotConfigured)
            })?;
            let body = req.extract::<Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to read the webhook body: {e}");
                ServerError::InvalidRequestBody(e.to_string())
            })?;
            let content_type = req.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);
            let payload = WebhookPayload::decode(content_type.as_deref(), body.as_ref()).map_err(|e| {
                warn!("🔐️ Could not decode the webhook body. {e}");
                ServerError::from(e)
            })?;
            reconciler.verify(&payload, &claimed).map_err(ServerError::from)?;
            trace!("🔐️ Webhook signature check ✅️");
            req.extensions_mut().insert(payload);
            service.call(req).await
        })
    }
}
