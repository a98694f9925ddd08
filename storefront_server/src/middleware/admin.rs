//! Guards the inventory administration routes with HTTP Basic authentication.
//!
//! The admin credentials are read from the application data (`web::Data<AdminConfig>`), so the same middleware can be
//! attached to any resource without further configuration.
use std::{
    future::{ready, Future, Ready},
    pin::Pin,
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web,
    Error,
};

use crate::{
    auth::check_basic_auth,
    config::AdminConfig,
    errors::{AuthError, ServerError},
};

#[derive(Default)]
pub struct AdminMiddlewareFactory;

impl AdminMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct AdminMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            let admin = req.app_data::<web::Data<AdminConfig>>().ok_or_else(|| {
                log::warn!("No admin configuration found in the application data");
                ServerError::from(AuthError::NotConfigured)
            })?;
            let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
            check_basic_auth(admin, header).map_err(ServerError::from)?;
            service.call(req).await
        })
    }
}
