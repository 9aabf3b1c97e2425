//! Inbound admin RPC endpoint
//!
//! Peers reach this node's local runner through a single `POST` route.
//! Every request must carry a bearer token signed with the cluster secret.

use crate::admin::rpc_client::{
    AuthRpcReply, ListLocksQuery, ListLocksReply, RpcResponse, ADMIN_SERVICE_ENDPOINT,
    RPC_METHOD_HEADER,
};
use crate::admin::runner::{CommandRunner, METHOD_LIST_LOCKS, METHOD_RESTART, METHOD_SHUTDOWN};
use crate::common::{Credential, Error, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Largest accepted RPC request body
const MAX_RPC_BODY: usize = 64 * 1024;

#[derive(Clone)]
pub struct AdminRpcState {
    pub credential: Arc<Credential>,
    pub local: Arc<dyn CommandRunner>,
}

pub fn create_router(state: AdminRpcState) -> Router {
    Router::new()
        .route(ADMIN_SERVICE_ENDPOINT, post(handle_rpc))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_RPC_BODY)),
        )
        .with_state(state)
}

fn reply<R: Serialize>(result: Result<R>) -> Response {
    match result {
        Ok(r) => (StatusCode::OK, Json(RpcResponse::ok(r))).into_response(),
        Err(e) => (
            e.to_http_status(),
            Json(RpcResponse::<()>::err(e.to_string())),
        )
            .into_response(),
    }
}

fn decode_args<A: DeserializeOwned>(body: &Bytes) -> Result<A> {
    serde_json::from_slice(body)
        .map_err(|e| Error::InvalidArgument(format!("malformed arguments: {}", e)))
}

fn authorize(state: &AdminRpcState, headers: &HeaderMap) -> Result<()> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::RpcAuth("missing Authorization header".into()))?;
    state.credential.authenticate(value).map(|_| ())
}

async fn handle_rpc(
    State(state): State<AdminRpcState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = authorize(&state, &headers) {
        tracing::warn!("rejected admin rpc: {}", e);
        return reply::<()>(Err(e));
    }

    let method = headers
        .get(RPC_METHOD_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    tracing::debug!(method, "admin rpc received");

    match method {
        METHOD_SHUTDOWN => reply(state.local.stop().await.map(|_| AuthRpcReply {})),
        METHOD_RESTART => reply(state.local.restart().await.map(|_| AuthRpcReply {})),
        METHOD_LIST_LOCKS => {
            let query: ListLocksQuery = match decode_args(&body) {
                Ok(q) => q,
                Err(e) => return reply::<()>(Err(e)),
            };
            let result = state
                .local
                .list_locks(&query.bucket, &query.prefix, query.min_age)
                .await
                .map(|volume_locks| ListLocksReply { volume_locks });
            reply(result)
        }
        other => reply::<()>(Err(Error::UnknownMethod(other.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::runner::LocalAdminClient;
    use crate::admin::service::{service_signal_channel, ServiceSignal, ServiceSignalReceiver};
    use crate::lock::{LockType, NamespaceParam, NsLockMap};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn setup() -> (Router, ServiceSignalReceiver, Credential) {
        let (tx, rx) = service_signal_channel(4);
        let locks = Arc::new(NsLockMap::new());
        locks.lock_blocked(
            NamespaceParam::new("photos", "cat.png"),
            "op-1",
            "GetObject",
            LockType::Read,
        );
        let credential = Credential::new("admin", "supersecret");
        let router = create_router(AdminRpcState {
            credential: Arc::new(credential.clone()),
            local: Arc::new(LocalAdminClient::new(tx, locks)),
        });
        (router, rx, credential)
    }

    fn request(credential: &Credential, method: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(ADMIN_SERVICE_ENDPOINT)
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", credential.issue_token().unwrap()),
            )
            .header(RPC_METHOD_HEADER, method)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_posts_stop() {
        let (router, mut rx, cred) = setup();
        let response = router
            .oneshot(request(&cred, METHOD_SHUTDOWN, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(rx.recv().await, Some(ServiceSignal::Stop));
    }

    #[tokio::test]
    async fn test_list_locks() {
        let (router, _rx, cred) = setup();
        let response = router
            .oneshot(request(
                &cred,
                METHOD_LIST_LOCKS,
                serde_json::json!({"bucket": "photos", "prefix": "", "minAge": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["error"].is_null());
        assert_eq!(json["reply"]["volumeLocks"][0]["object"], "cat.png");
    }

    #[tokio::test]
    async fn test_bad_token_rejected() {
        let (router, mut rx, _) = setup();
        let intruder = Credential::new("admin", "wrongsecret");
        let response = router
            .oneshot(request(&intruder, METHOD_SHUTDOWN, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(json_body(response).await["error"].is_string());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (router, _rx, cred) = setup();
        let response = router
            .oneshot(request(&cred, "Admin.Format", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_list_locks_args() {
        let (router, _rx, cred) = setup();
        let response = router
            .oneshot(request(&cred, METHOD_LIST_LOCKS, serde_json::json!({"bucket": 7})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
