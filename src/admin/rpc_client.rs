//! Authenticated admin RPC client
//!
//! A call is a JSON `POST` to the peer's admin service endpoint. The method
//! name travels in the `x-rpc-method` header and a freshly issued bearer
//! token authenticates every request. Replies use [`RpcResponse`]. Calls are
//! never retried here; deadlines come from the underlying HTTP client.

use crate::common::utils::duration_nanos;
use crate::common::{Credential, Error, Result};
use crate::lock::VolumeLockInfo;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the admin RPC endpoint on every node
pub const ADMIN_SERVICE_ENDPOINT: &str = "/minikv/admin/rpc";
/// Service prefix of admin RPC method names
pub const ADMIN_SERVICE_NAME: &str = "Admin";
/// Header carrying the RPC method name
pub const RPC_METHOD_HEADER: &str = "x-rpc-method";

/// Arguments of calls that take none.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthRpcArgs {}

/// Reply of calls that return nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthRpcReply {}

/// Arguments of `Admin.ListLocks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListLocksQuery {
    pub bucket: String,
    pub prefix: String,
    #[serde(rename = "minAge", with = "duration_nanos")]
    pub min_age: Duration,
}

/// Reply of `Admin.ListLocks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListLocksReply {
    #[serde(rename = "volumeLocks", default)]
    pub volume_locks: Vec<VolumeLockInfo>,
}

/// Envelope of every RPC reply: exactly one of `error` and `reply` is set.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<R> {
    #[serde(default)]
    pub error: Option<String>,
    pub reply: Option<R>,
}

impl<R> RpcResponse<R> {
    pub fn ok(reply: R) -> Self {
        Self {
            error: None,
            reply: Some(reply),
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            reply: None,
        }
    }
}

/// Connection parameters for one peer.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub credential: Credential,
    /// host:port of the peer
    pub server_addr: String,
    pub secure_conn: bool,
    pub service_endpoint: String,
    pub service_name: String,
}

impl AuthConfig {
    /// Admin service parameters for `server_addr`.
    pub fn admin(credential: Credential, server_addr: impl Into<String>, secure_conn: bool) -> Self {
        Self {
            credential,
            server_addr: server_addr.into(),
            secure_conn,
            service_endpoint: ADMIN_SERVICE_ENDPOINT.to_string(),
            service_name: ADMIN_SERVICE_NAME.to_string(),
        }
    }

    fn url(&self) -> String {
        let scheme = if self.secure_conn { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.server_addr, self.service_endpoint)
    }
}

/// RPC client bound to one peer.
#[derive(Debug, Clone)]
pub struct AuthRpcClient {
    config: AuthConfig,
    url: String,
    http: reqwest::Client,
}

impl AuthRpcClient {
    pub fn new(config: AuthConfig, http: reqwest::Client) -> Self {
        let url = config.url();
        Self { config, url, http }
    }

    /// HTTP client shared by every peer client, with the per-call deadline.
    pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build RPC client: {}", e)))
    }

    pub fn server_addr(&self) -> &str {
        &self.config.server_addr
    }

    /// Issue `method` with `args` and decode the peer's reply.
    pub async fn call<A, R>(&self, method: &str, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        if !method.starts_with(&format!("{}.", self.config.service_name)) {
            return Err(Error::UnknownMethod(method.to_string()));
        }
        tracing::debug!(peer = %self.config.server_addr, method, "admin rpc call");

        let token = self.config.credential.issue_token()?;
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(token)
            .header(RPC_METHOD_HEADER, method)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let envelope: RpcResponse<R> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(Error::Rpc(format!("malformed reply: {}", e)))
            }
            Err(_) => return Err(Error::Rpc(format!("unexpected status {}", status))),
        };

        if let Some(error) = envelope.error {
            return Err(match status {
                StatusCode::UNAUTHORIZED => Error::RpcAuth(error),
                StatusCode::BAD_REQUEST => Error::Rpc(error),
                _ => Error::Remote(error),
            });
        }
        envelope
            .reply
            .ok_or_else(|| Error::Rpc("reply missing from response".into()))
    }
}
