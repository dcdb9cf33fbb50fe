use crate::interface_adapters::binding::bind;
use crate::interface_adapters::context::Context;
use crate::interface_adapters::errors::ClassifiedError;
use crate::interface_adapters::protocol::ErrorResponse;
use axum::Json;
use axum::extract::Request;
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use tracing::Instrument;

/// Marker for the [`Handler`] impl of [`JsonHandler`].
#[doc(hidden)]
pub struct JsonBinding;

/// A typed handler exposed as an axum handler. Built by [`json`].
pub struct JsonHandler<F, S, Req> {
    handler: F,
    _marker: PhantomData<fn() -> (S, Req)>,
}

impl<F: Clone, S, Req> Clone for JsonHandler<F, S, Req> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            _marker: PhantomData,
        }
    }
}

/// Adapt `handler` into an axum handler that binds path, query and JSON body
/// into `Req` (in that order, later sources win) and answers with the JSON of
/// `Resp` or `{"error": ..}` with the status the error classifies as.
///
/// ```ignore
/// Router::new()
///     .route("/users/{id}", get(json(handlers::get_user)))
///     .with_state(state)
/// ```
pub fn json<F, Fut, S, Req, Resp, E>(handler: F) -> JsonHandler<F, S, Req>
where
    F: FnOnce(Context<S>, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, E>> + Send + 'static,
    S: Clone + Send + Sync + 'static,
    Req: Default + Serialize + DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    E: ClassifiedError + Send + 'static,
{
    JsonHandler {
        handler,
        _marker: PhantomData,
    }
}

impl<F, Fut, S, Req, Resp, E> Handler<JsonBinding, S> for JsonHandler<F, S, Req>
where
    F: FnOnce(Context<S>, Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, E>> + Send + 'static,
    S: Clone + Send + Sync + 'static,
    Req: Default + Serialize + DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    E: ClassifiedError + Send + 'static,
{
    type Future = BoxFuture<'static, Response>;

    fn call(self, req: Request, state: S) -> Self::Future {
        dispatch(self.handler, req, state).boxed()
    }
}

async fn dispatch<F, Fut, S, Req, Resp, E>(handler: F, req: Request, state: S) -> Response
where
    F: FnOnce(Context<S>, Req) -> Fut,
    Fut: Future<Output = Result<Resp, E>>,
    S: Clone + Send + Sync,
    Req: Default + Serialize + DeserializeOwned,
    Resp: Serialize,
    E: ClassifiedError,
{
    let (parts, body) = req.into_parts();
    let ctx = Context::from_parts(&parts, state.clone());
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id(),
        method = %parts.method,
        path = %parts.uri.path(),
    );

    async move {
        let request = match bind::<Req, S>(parts, body, &state).await {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(error = %err, "request binding rejected");
                return error_response(&err);
            }
        };

        match handler(ctx, request).await {
            Ok(response) => success_response(&response),
            Err(err) => {
                let response = error_response(&err);
                if response.status().is_server_error() {
                    tracing::error!(status = %response.status(), error = %err, "handler failed");
                } else {
                    tracing::warn!(status = %response.status(), error = %err, "handler rejected request");
                }
                response
            }
        }
    }
    .instrument(span)
    .await
}

fn success_response<Resp: Serialize>(response: &Resp) -> Response {
    // Serialize up front so a failure still yields a JSON error body.
    match serde_json::to_value(response) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize response");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn error_response<E: ClassifiedError + ?Sized>(err: &E) -> Response {
    let status = err
        .status_code()
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_error(status, err.message())
}

// Helper to build a JSON error response.
pub(crate) fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_error;
    use crate::interface_adapters::errors::ApiError;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::routing::{get, post};
    use serde::Deserialize;
    use serde_json::{Value, json as json_value};
    use std::collections::BTreeMap;
    use std::convert::Infallible;
    use thiserror::Error;
    use tower::ServiceExt;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct EchoRequest {
        id: String,
        name: String,
        limit: u32,
        tags: Vec<String>,
        note: Option<String>,
    }

    #[derive(Debug, Error)]
    #[error("payment required for {0}")]
    struct PaywallError(String);

    impl ClassifiedError for PaywallError {
        fn status_code(&self) -> Option<StatusCode> {
            Some(StatusCode::PAYMENT_REQUIRED)
        }
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode response"))
        }
    }

    async fn echo(_ctx: Context<()>, req: EchoRequest) -> Result<EchoRequest, Infallible> {
        Ok(req)
    }

    async fn teapot(_ctx: Context<()>, _req: EchoRequest) -> Result<EchoRequest, ApiError> {
        Err(api_error!(StatusCode::IM_A_TEAPOT, "short and {}", "stout"))
    }

    async fn plain_failure(
        _ctx: Context<()>,
        _req: EchoRequest,
    ) -> Result<EchoRequest, anyhow::Error> {
        Err(anyhow::anyhow!("disk on fire"))
    }

    async fn paywall(_ctx: Context<()>, req: EchoRequest) -> Result<EchoRequest, PaywallError> {
        Err(PaywallError(req.name))
    }

    async fn broken(_ctx: Context<()>, _req: EchoRequest) -> Result<Unserializable, Infallible> {
        Ok(Unserializable)
    }

    async fn no_input(_ctx: Context<()>, _req: ()) -> Result<BTreeMap<String, u32>, Infallible> {
        Ok(BTreeMap::from([("answer".to_string(), 42)]))
    }

    async fn with_state(ctx: Context<&'static str>, _req: ()) -> Result<Value, Infallible> {
        Ok(json_value!({ "service": ctx.state }))
    }

    fn build_test_app() -> Router {
        Router::new()
            .route("/echo", post(json(echo)).get(json(echo)))
            .route("/echo/{id}", post(json(echo)).get(json(echo)))
            .route("/echo/{id}/{name}", get(json(echo)))
            .route("/teapot", get(json(teapot)))
            .route("/plain", get(json(plain_failure)))
            .route("/paywall", get(json(paywall)))
            .route("/broken", get(json(broken)))
            .route("/no-input", post(json(no_input)))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .expect("expected request to build");

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("expected response body");
        let payload: Value = serde_json::from_slice(&body).expect("expected json body");
        (status, payload)
    }

    #[tokio::test]
    async fn when_all_sources_are_present_then_fields_are_merged() {
        let (status, payload) = send(
            build_test_app(),
            "POST",
            "/echo/7?limit=3&tags=a&tags=b",
            Body::from(r#"{"name":"from-body"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            payload,
            json_value!({
                "id": "7",
                "name": "from-body",
                "limit": 3,
                "tags": ["a", "b"],
                "note": null
            })
        );
    }

    #[tokio::test]
    async fn when_query_and_path_overlap_then_query_wins() {
        let (status, payload) =
            send(build_test_app(), "GET", "/echo/7/from-path?name=from-query", Body::empty()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["id"], "7");
        assert_eq!(payload["name"], "from-query");
    }

    #[tokio::test]
    async fn when_body_and_query_overlap_then_body_wins() {
        let (status, payload) = send(
            build_test_app(),
            "POST",
            "/echo?name=from-query&note=q",
            Body::from(r#"{"name":"from-body"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["name"], "from-body");
        assert_eq!(payload["note"], "q");
    }

    #[tokio::test]
    async fn when_body_is_missing_then_request_still_binds() {
        let (status, payload) = send(build_test_app(), "GET", "/echo?name=abc", Body::empty()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["name"], "abc");
        assert_eq!(payload["limit"], 0);
    }

    #[tokio::test]
    async fn when_body_is_malformed_then_returns_400_and_error_message() {
        let (status, payload) =
            send(build_test_app(), "POST", "/echo", Body::from(r#"{"name":"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].is_string());
    }

    #[tokio::test]
    async fn when_body_field_has_wrong_type_then_returns_400() {
        let (status, payload) =
            send(build_test_app(), "POST", "/echo", Body::from(r#"{"limit":"many"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            payload["error"]
                .as_str()
                .expect("expected error message")
                .contains("invalid type")
        );
    }

    #[tokio::test]
    async fn when_query_value_cannot_be_coerced_then_returns_400() {
        let (status, payload) =
            send(build_test_app(), "GET", "/echo?limit=lots", Body::empty()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "invalid value: string \"lots\", expected u32");
    }

    #[tokio::test]
    async fn when_path_value_cannot_be_coerced_then_returns_400() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        struct PageRequest {
            page: u32,
        }

        async fn page(_ctx: Context<()>, req: PageRequest) -> Result<PageRequest, Infallible> {
            Ok(req)
        }

        let app = Router::new().route("/pages/{page}", get(json(page)));

        let (status, payload) = send(app.clone(), "GET", "/pages/2", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["page"], 2);

        let (status, payload) = send(app, "GET", "/pages/two", Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"], "invalid value: string \"two\", expected u32");
    }

    #[tokio::test]
    async fn when_optional_and_list_fields_are_numeric_then_path_and_query_bind_them() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        struct FilterRequest {
            page: Option<u32>,
            ids: Vec<u32>,
            flag: Option<bool>,
        }

        async fn filter(_ctx: Context<()>, req: FilterRequest) -> Result<FilterRequest, Infallible> {
            Ok(req)
        }

        let app = Router::new()
            .route("/filter", get(json(filter)))
            .route("/filter/{page}", get(json(filter)));

        let (status, payload) = send(
            app.clone(),
            "GET",
            "/filter/2?ids=1&ids=2&flag=true",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            payload,
            json_value!({ "page": 2, "ids": [1, 2], "flag": true })
        );

        let (status, payload) = send(app, "GET", "/filter?ids=7", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            payload,
            json_value!({ "page": null, "ids": [7], "flag": null })
        );
    }

    #[tokio::test]
    async fn when_query_has_extra_keys_then_strict_request_types_still_bind() {
        #[derive(Debug, Default, Serialize, Deserialize)]
        #[serde(deny_unknown_fields)]
        struct StrictRequest {
            id: String,
            name: String,
        }

        async fn strict(_ctx: Context<()>, req: StrictRequest) -> Result<StrictRequest, Infallible> {
            Ok(req)
        }

        let app = Router::new().route("/strict/{id}", get(json(strict)));

        let (status, payload) = send(
            app,
            "GET",
            "/strict/9?name=ada&utm_source=mail",
            Body::empty(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json_value!({ "id": "9", "name": "ada" }));
    }

    #[tokio::test]
    async fn when_handler_error_has_status_then_response_uses_it() {
        let (status, payload) = send(build_test_app(), "GET", "/teapot", Body::empty()).await;

        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(payload, json_value!({ "error": "short and stout" }));
    }

    #[tokio::test]
    async fn when_handler_error_has_no_status_then_returns_500() {
        let (status, payload) = send(build_test_app(), "GET", "/plain", Body::empty()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload, json_value!({ "error": "disk on fire" }));
    }

    #[tokio::test]
    async fn when_handler_uses_its_own_error_kind_then_its_status_is_used() {
        let (status, payload) =
            send(build_test_app(), "GET", "/paywall?name=pilot", Body::empty()).await;

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(payload["error"], "payment required for pilot");
    }

    #[tokio::test]
    async fn when_response_cannot_be_serialized_then_returns_500_json() {
        let (status, payload) = send(build_test_app(), "GET", "/broken", Body::empty()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload["error"], "cannot encode response");
    }

    #[tokio::test]
    async fn when_request_type_is_unit_then_body_is_ignored() {
        let (status, payload) =
            send(build_test_app(), "POST", "/no-input", Body::from("not json")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json_value!({ "answer": 42 }));
    }

    #[tokio::test]
    async fn when_router_has_state_then_context_carries_it() {
        let app = Router::new()
            .route("/state", get(json(with_state)))
            .with_state("users");

        let (status, payload) = send(app, "GET", "/state", Body::empty()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json_value!({ "service": "users" }));
    }
}
