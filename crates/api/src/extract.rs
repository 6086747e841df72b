//! Request extractors with enveloped rejections.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` with rejections rendered through the standard error
/// envelope (422 + `VALIDATION_ERROR`).
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);
