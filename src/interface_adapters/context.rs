use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request-scoped context handed to every adapted handler.
///
/// Cancellation follows the runtime: when the client disconnects the request
/// future is dropped, and the handler future with it.
#[derive(Debug, Clone)]
pub struct Context<S> {
    pub state: S,
    request_id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl<S> Context<S> {
    pub(crate) fn from_parts(parts: &Parts, state: S) -> Self {
        // Reuse the caller's id when one is supplied so logs line up across hops.
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            state,
            request_id,
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}
