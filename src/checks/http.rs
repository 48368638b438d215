//! HTTP endpoint checks
//!
//! One check is one GET request. The outcome distinguishes a transport
//! failure (no response at all) from a status mismatch (a response with an
//! unexpected code); only the former may take a check down.

use crate::config::HttpCheckParameters;
use crate::error::ButterbotError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Minimal HTTP capability needed by the evaluator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET and return the response status code.
    ///
    /// # Errors
    ///
    /// Returns `ButterbotError::Transport` if no response was received
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        skip_tls_verify: bool,
    ) -> Result<u16, ButterbotError>;
}

/// [`HttpTransport`] backed by `reqwest`.
///
/// Keeps one client that verifies certificates and one that does not,
/// since TLS verification is a client-level setting.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    verified: Client,
    insecure: Client,
}

impl ReqwestTransport {
    /// Build both clients
    ///
    /// # Errors
    ///
    /// Returns error if a client cannot be built
    pub fn new() -> Result<Self, ButterbotError> {
        Ok(Self {
            verified: Client::builder().build()?,
            insecure: Client::builder().danger_accept_invalid_certs(true).build()?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        skip_tls_verify: bool,
    ) -> Result<u16, ButterbotError> {
        let client = if skip_tls_verify {
            &self.insecure
        } else {
            &self.verified
        };

        let response = client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ButterbotError::Transport(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}

/// Outcome of a single HTTP check
#[derive(Debug)]
pub struct CheckResult {
    /// Whether the endpoint answered with the expected code
    pub succeeded: bool,
    /// Human readable description of the outcome
    pub detail: String,
    /// Set for transport and configuration failures, unset for status mismatches
    pub failure: Option<ButterbotError>,
}

impl CheckResult {
    fn success(detail: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            detail: detail.into(),
            failure: None,
        }
    }

    fn mismatch(detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            detail: detail.into(),
            failure: None,
        }
    }

    fn failed(detail: impl Into<String>, failure: ButterbotError) -> Self {
        Self {
            succeeded: false,
            detail: detail.into(),
            failure: Some(failure),
        }
    }

    /// Whether the check failed because no response was received
    pub fn is_transport_failure(&self) -> bool {
        !self.succeeded && self.failure.as_ref().is_some_and(|e| e.is_transport())
    }

    /// Short label for metrics
    pub fn outcome(&self) -> &'static str {
        match (&self.failure, self.succeeded) {
            (_, true) => "success",
            (Some(e), false) if e.is_transport() => "transport_error",
            (Some(_), false) => "config_error",
            (None, false) => "status_mismatch",
        }
    }
}

/// Runs HTTP checks through an [`HttpTransport`]
#[derive(Clone)]
pub struct HttpCheckEvaluator {
    transport: Arc<dyn HttpTransport>,
}

impl HttpCheckEvaluator {
    /// Create an evaluator using `transport`
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Request the endpoint described by `params` exactly once
    pub async fn evaluate(&self, params: &HttpCheckParameters) -> CheckResult {
        if !params.verb.eq_ignore_ascii_case("get") {
            let detail = format!(
                "unsupported verb: received [{}], expecting [get]",
                params.verb
            );
            return CheckResult::failed(detail.clone(), ButterbotError::Config(detail));
        }

        match self
            .transport
            .get(&params.url, params.timeout(), params.skip_verify)
            .await
        {
            Err(e) => {
                debug!(url = %params.url, error = %e, "HTTP GET request failed");
                CheckResult::failed("HTTP GET request failed", e)
            }
            Ok(status) if status == params.code => {
                CheckResult::success("HTTP GET request succeeded")
            }
            Ok(status) => CheckResult::mismatch(format!(
                "received status code [{}] other than configured [{}]",
                status, params.code
            )),
        }
    }
}
