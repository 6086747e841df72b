//! Request-ID propagation.
//!
//! Every response carries `X-Request-ID`, echoing the inbound header or a
//! newly minted UUID. Error envelopes produced downstream are re-rendered
//! here so their `request_id` field matches the header.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::error::ErrorBody;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub async fn propagate_request_id(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = next.run(request).await;

    if let Some(body) = response.extensions().get::<ErrorBody>().cloned() {
        let status = response.status();
        response = (status, axum::Json(body.to_json(&request_id))).into_response();
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
