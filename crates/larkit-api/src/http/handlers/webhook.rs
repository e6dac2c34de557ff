//! Webhook endpoint: hands the raw request to the gateway and writes back
//! whatever it produced.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use larkit_types::webhook::{InboundEnvelope, WebhookQuery, WebhookResponse};

use crate::http::error::AppError;
use crate::state::AppState;

pub async fn receive(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<WebhookQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let envelope = inbound_envelope(&method, query, &headers, &body);
    let response = state.gateway.serve(envelope).await?;
    Ok(into_http(response))
}

fn inbound_envelope(
    method: &Method,
    query: WebhookQuery,
    headers: &HeaderMap,
    body: &Bytes,
) -> InboundEnvelope {
    let envelope = InboundEnvelope::new(method.as_str(), query, body.to_vec());
    match headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some(content_type) => envelope.with_content_type(content_type),
        None => envelope,
    }
}

fn into_http(response: WebhookResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    (status, [(CONTENT_TYPE, response.content_type)], response.body).into_response()
}
