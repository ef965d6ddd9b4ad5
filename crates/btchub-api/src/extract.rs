use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON request body. Unlike `axum::Json`, a malformed or incomplete body is
/// answered with a 400 `{ "message": ... }` like every other handler error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
