use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tower_http::request_id::{MakeRequestId, RequestId, SetRequestIdLayer};
use tracing::{info, info_span, Instrument};

const REQUEST_ID_LEN: usize = 16;
const REQUEST_ID_CHARSET: &str = "abcdef0123456789";

#[derive(Debug, Clone, Default)]
pub struct MakeWaypointRequestId;

impl MakeRequestId for MakeWaypointRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = random_string::generate(REQUEST_ID_LEN, REQUEST_ID_CHARSET);
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeWaypointRequestId> {
    SetRequestIdLayer::x_request_id(MakeWaypointRequestId)
}

pub async fn trace_request(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let span = info_span!(
        "http.request",
        method = %request.method(),
        path = %request.uri().path(),
        %request_id,
    );

    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            latency = ?started.elapsed(),
            "request completed"
        );
    });

    response
}
