use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

use super::error::ApiError;
use crate::auth::{bearer_credential, Principal, TokenVerifier};

/// The verified caller of a request. Requires `web::Data<dyn TokenVerifier>`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl FromRequest for Authenticated {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Authenticated, ApiError> {
    let verifier = req.app_data::<web::Data<dyn TokenVerifier>>().ok_or_else(|| {
        tracing::error!("No token verifier registered");
        ApiError::Internal("Authentication unavailable")
    })?;

    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let credential = bearer_credential(header)?;

    let principal = verifier.verify(credential).map_err(|e| {
        tracing::debug!(error = %e, path = %req.path(), "Rejected credential");
        e
    })?;

    Ok(Authenticated(principal))
}
