//! Request extractors.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::API_KEY_HEADER;
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use clinica_core::RequestContext;

/// The acting staff member, resolved from the `x-api-key` header.
///
/// A missing or unknown key is rejected with 403 before the body is read.
pub struct Ctx(pub RequestContext);

#[axum::async_trait]
impl FromRequestParts<AppState> for Ctx {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        let ctx = state.staff.authenticate(api_key)?;
        if ctx.actor().is_none() {
            return Err(ApiError::forbidden("a valid API key is required"));
        }
        Ok(Ctx(ctx))
    }
}

/// JSON request body whose rejection is a 422 `{ "error": message }` response.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
