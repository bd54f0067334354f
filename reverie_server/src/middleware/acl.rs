//! Access control list middleware for the reverie server.
//! This middleware can be placed on any route or service.
//!
//! It checks the incoming request for a valid bearer JWT and then checks the role in the token against the roles the
//! route accepts. An empty role list admits any authenticated caller. A missing or invalid token gets a 401, and a
//! role that is not on the list gets a 403. On success the claims are stored in the request extensions, where the
//! [`JwtClaims`] extractor finds them.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web,
    Error,
    HttpMessage,
};
use futures::{
    future::{ok, Ready},
    Future,
};
use log::*;
use reverie_engine::db_types::Role;

use crate::{
    auth::{JwtClaims, TokenVerifier},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S> AclMiddlewareService<S> {
    fn authorize(req: &ServiceRequest, allowed_roles: &[Role]) -> Result<JwtClaims, ServerError> {
        let verifier = req.app_data::<web::Data<TokenVerifier>>().ok_or_else(|| {
            error!("💻️ No token verifier has been configured. All authenticated routes will fail.");
            ServerError::InitializeError("No token verifier has been configured".into())
        })?;
        let header = req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok());
        let token = TokenVerifier::bearer_token(header)?;
        let claims = verifier.verify(token)?;
        if allowed_roles.is_empty() || allowed_roles.contains(&claims.role) {
            Ok(claims)
        } else {
            debug!("💻️ {} ({}) may not call {}", claims.sub, claims.role, req.path());
            Err(AuthError::InsufficientPermissions(format!("This route is not available to the {} role", claims.role))
                .into())
        }
    }
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let allowed_roles = self.allowed_roles.clone();
        Box::pin(async move {
            match Self::authorize(&req, &allowed_roles) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                },
                Err(e) => Ok(req.error_response(e).map_into_right_body()),
            }
        })
    }
}
