use axum::response::{IntoResponse, Response};
use std::any::Any;
use tracing::error;

use crate::error::ApiError;

pub fn catch_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    error!(%detail, "request handler panicked");
    ApiError::unknown().detail(detail).into_response()
}
