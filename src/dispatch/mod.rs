//! Tool invocation to authenticated catalog call.

pub mod request;
pub mod result;

pub use request::PreparedRequest;
pub use result::{HealthReport, HealthStatus, OutboundCallResult};

use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;

use crate::auth::{Credential, TokenGuard};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::tools::{normalize_arguments, validate_arguments, ToolCatalog, ToolInvocation};
use crate::util::RetryPolicy;

enum Reply {
    Payload(Value),
    Unauthorized(StatusCode),
}

/// Resolves, validates and executes tool invocations against the catalog.
///
/// Credentials come only from the [`TokenGuard`]; a 401/403 from the catalog
/// invalidates the credential and the call is retried once with a new one.
///
/// # Example
/// ```no_run
/// use shuttle_bridge::config::BridgeConfig;
/// use shuttle_bridge::dispatch::CallDispatcher;
/// use shuttle_bridge::tools::ToolInvocation;
///
/// # async fn run() -> Result<(), shuttle_bridge::error::BridgeError> {
/// let dispatcher = CallDispatcher::from_config(&BridgeConfig::from_env()?)?;
/// let result = dispatcher
///     .dispatch(&ToolInvocation::new("get_all_tags", serde_json::json!({})))
///     .await;
/// println!("{}", serde_json::to_string_pretty(&result)?);
/// # Ok(())
/// # }
/// ```
pub struct CallDispatcher {
    http: reqwest::Client,
    api_base: reqwest::Url,
    guard: Arc<TokenGuard>,
    catalog: ToolCatalog,
    retry: RetryPolicy,
}

impl CallDispatcher {
    pub fn new(http: reqwest::Client, api_base: reqwest::Url, guard: Arc<TokenGuard>) -> Self {
        Self {
            http,
            api_base,
            guard,
            catalog: ToolCatalog::standard(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        config.validate()?;
        let http = config.http_client()?;
        let guard = TokenGuard::from_config(config, http.clone(), config.credential_store());
        Ok(Self::new(http, config.api_base_url()?, Arc::new(guard)).with_retry(config.retry.clone()))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn guard(&self) -> &Arc<TokenGuard> {
        &self.guard
    }

    pub fn api_base(&self) -> &reqwest::Url {
        &self.api_base
    }

    /// Execute an invocation, folding every failure into a structured error.
    pub async fn dispatch(&self, invocation: &ToolInvocation) -> OutboundCallResult {
        match self.call(invocation).await {
            Ok(payload) => OutboundCallResult::success(payload),
            Err(err) => {
                tracing::warn!(tool = %invocation.tool_name, error = %err, "tool call failed");
                OutboundCallResult::Failure(err.to_tool_error())
            }
        }
    }

    pub async fn call(&self, invocation: &ToolInvocation) -> Result<Value> {
        let tool = self
            .catalog
            .get(&invocation.tool_name)
            .ok_or_else(|| BridgeError::UnknownTool(invocation.tool_name.clone()))?;
        let args = normalize_arguments(&invocation.arguments)
            .map_err(|reason| BridgeError::invalid_arguments(tool.name, reason))?;
        validate_arguments(&args, &tool.input_schema())
            .map_err(|reason| BridgeError::invalid_arguments(tool.name, reason))?;
        let request = PreparedRequest::build(&self.api_base, tool, &args)?;

        tracing::debug!(tool = tool.name, method = %request.method, url = %request.url, "dispatching");
        let credential = self.guard.acquire().await?;
        let status = match self.send_with_retry(&request, &credential).await? {
            Reply::Payload(payload) => return Ok(payload),
            Reply::Unauthorized(status) => status,
        };

        tracing::info!(tool = tool.name, %status, "catalog rejected credential; re-authenticating");
        self.guard.invalidate()?;
        let credential = self.guard.acquire().await?;
        match self.send_with_retry(&request, &credential).await? {
            Reply::Payload(payload) => Ok(payload),
            Reply::Unauthorized(status) => Err(BridgeError::AuthenticationRequired(format!(
                "catalog rejected a renewed credential with status {status}"
            ))),
        }
    }

    /// Probe the catalog tag endpoint with the current credential.
    ///
    /// Never starts a device flow and never fails.
    pub async fn health(&self) -> HealthReport {
        let (authenticated, error) = match self.probe().await {
            Ok(()) => (true, None),
            Err((authenticated, err)) => (authenticated, Some(err.to_string())),
        };
        HealthReport {
            status: if error.is_none() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            timestamp: Utc::now(),
            api_base: self.api_base.to_string(),
            authenticated,
            error,
        }
    }

    async fn probe(&self) -> std::result::Result<(), (bool, BridgeError)> {
        let credential = match self.guard.acquire_cached().await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                return Err((
                    false,
                    BridgeError::AuthenticationRequired("no credential; run `auth login`".into()),
                ))
            }
            Err(err) => return Err((false, err.into())),
        };
        let tool = self
            .catalog
            .get("get_all_tags")
            .ok_or_else(|| (true, BridgeError::UnknownTool("get_all_tags".into())))?;
        let request = PreparedRequest::build(&self.api_base, tool, &serde_json::Map::new())
            .map_err(|err| (true, err))?;
        match self.send_once(&request, &credential).await {
            Ok(Reply::Payload(_)) => Ok(()),
            Ok(Reply::Unauthorized(status)) => Err((
                false,
                BridgeError::AuthenticationRequired(format!("catalog answered {status}")),
            )),
            Err(err) => Err((true, err)),
        }
    }

    async fn send_with_retry(
        &self,
        request: &PreparedRequest,
        credential: &Credential,
    ) -> Result<Reply> {
        self.retry
            .execute(|| self.send_once(request, credential))
            .await
    }

    async fn send_once(&self, request: &PreparedRequest, credential: &Credential) -> Result<Reply> {
        let mut builder = self
            .http
            .request(request.method.into(), request.url.clone())
            .bearer_auth(&credential.access_token)
            .header("Accept", "application/json")
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(Reply::Unauthorized(status));
        }
        let text = response.text().await?;
        let body = decode_body(&text);
        if status.is_success() {
            Ok(Reply::Payload(body))
        } else {
            Err(BridgeError::RemoteRejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Empty bodies become `{}`; bodies that are not JSON are passed through as a string.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
