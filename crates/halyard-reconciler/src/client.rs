use std::sync::Arc;

use halyard_core::Resource;
use halyard_transport::{
    HttpTransport, Method, Request, Response, RetryPolicy, RetryingTransport, Transport,
    TransportError,
};
use serde_json::Value as Json;

use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::error::ReconcileError;
use crate::url;

/// Shared handle for talking to the monitoring API.
///
/// Holds no mutable state; clone it freely and use it from concurrent
/// applies.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    retry: Arc<dyn RetryPolicy>,
    config: Config,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client over an existing transport. The conflict-retry policy
    /// comes from `config.retry`.
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        let retry: Arc<dyn RetryPolicy> = Arc::new(config.retry.backoff());
        Self {
            transport,
            retry,
            config,
        }
    }

    /// Production stack: reqwest transport with transient-failure retries,
    /// sharing one policy with the apply loop.
    pub fn from_config(config: Config) -> Result<Self, ReconcileError> {
        let mut http = HttpTransport::new(&config.user_agent)
            .map_err(|e| ReconcileError::transport("building HTTP client", e))?;
        if let Some(token) = &config.access_token {
            http = http.with_access_token(token.clone());
        }
        let retry: Arc<dyn RetryPolicy> = Arc::new(config.retry.backoff());
        let transport: Arc<dyn Transport> = Arc::new(RetryingTransport::new(http, retry.clone()));
        Ok(Self {
            transport,
            retry,
            config,
        })
    }

    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn retry_policy(&self) -> &dyn RetryPolicy {
        self.retry.as_ref()
    }

    /// Build a request for `template`, filling placeholders from the
    /// identity fields of `resource`.
    pub fn request(
        &self,
        method: Method,
        template: &str,
        resource: &Resource,
    ) -> Result<Request, ReconcileError> {
        let endpoint = url::for_resource(&self.config.base_path, template, resource)?;
        let mut request = Request::new(method, endpoint.url);
        request.query = endpoint.query;
        Ok(request)
    }

    /// Send one request, bounded by the configured timeout and aborted early
    /// if `cancel` fires.
    pub async fn send(
        &self,
        request: &Request,
        cancel: &CancelSignal,
    ) -> Result<Response, TransportError> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled {
                url: request.url.clone(),
            });
        }

        let call = async {
            match self.config.timeout() {
                Some(limit) => tokio::time::timeout(limit, self.transport.send(request))
                    .await
                    .map_err(|_| TransportError::Timeout {
                        url: request.url.clone(),
                    })?,
                None => self.transport.send(request).await,
            }
        };

        tokio::select! {
            result = call => result,
            _ = cancel.cancelled() => Err(TransportError::Cancelled {
                url: request.url.clone(),
            }),
        }
    }

    /// Send and parse the response body as JSON.
    pub async fn send_json(
        &self,
        request: &Request,
        cancel: &CancelSignal,
    ) -> Result<Json, TransportError> {
        self.send(request, cancel).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use halyard_transport::BoxFuture;

    use super::*;

    /// Answers `{}` after a fixed delay.
    struct SlowTransport(Duration);

    impl Transport for SlowTransport {
        fn send<'a>(
            &'a self,
            _request: &'a Request,
        ) -> BoxFuture<'a, Result<Response, TransportError>> {
            Box::pin(async move {
                tokio::time::sleep(self.0).await;
                Ok(Response {
                    status: 200,
                    body: b"{}".to_vec(),
                })
            })
        }
    }

    fn client(timeout_secs: u64, delay: Duration) -> Client {
        let config = Config {
            timeout_secs,
            ..Config::default()
        };
        Client::new(config, Arc::new(SlowTransport(delay)))
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let client = client(1, Duration::from_secs(5));
        let request = Request::new(Method::Get, "https://monitoring.example/v3/x");

        let err = client
            .send(&request, &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Timeout { .. }), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_waits_for_the_response() {
        let client = client(0, Duration::from_secs(300));
        let request = Request::new(Method::Get, "https://monitoring.example/v3/x");

        let body = client
            .send_json(&request, &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(body, serde_json::json!({}));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_a_call_in_flight() {
        let client = client(0, Duration::from_secs(300));
        let request = Request::new(Method::Get, "https://monitoring.example/v3/x");
        let (handle, signal) = crate::cancel::cancel_pair();

        let call = client.send(&request, &signal);
        let cancel = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        };
        let (result, ()) = tokio::join!(call, cancel);

        assert!(matches!(result, Err(TransportError::Cancelled { .. })));
    }
}
