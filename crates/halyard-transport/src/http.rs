use crate::error::{TransportError, error_for_status};
use crate::request::{Method, Request, Response};
use crate::{BoxFuture, Transport};

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    access_token: Option<String>,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self {
            client,
            access_token: None,
        })
    }

    /// Attach a pre-issued OAuth access token to every request.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(reqwest_method(request.method), &request.url)
                .query(&request.query);
            if let Some(token) = &self.access_token {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            tracing::debug!(method = %request.method, url = %request.url, "sending request");
            let resp = builder
                .send()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let status = resp.status().as_u16();
            let body = resp
                .bytes()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?
                .to_vec();
            tracing::debug!(status, url = %request.url, "received response");

            if let Some(err) = error_for_status(status, &request.url, &body) {
                return Err(err);
            }
            Ok(Response { status, body })
        })
    }
}
