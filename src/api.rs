use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, RequestBuilder, Response, Url,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ClientError, Result};

/// HTTP wrapper bound to a single backend base URL. Every request and
/// response body is JSON. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base: config.api_base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidConfig(format!("bad endpoint path `{path}`: {e}")))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let req = self.request(Method::GET, path)?;
        self.send_json(Method::GET, path, req).await
    }

    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let req = self.request(Method::GET, path)?.query(query);
        self.send_json(Method::GET, path, req).await
    }

    pub async fn get_bearer<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T> {
        let req = self
            .request(Method::GET, path)?
            .header(AUTHORIZATION, format!("Bearer {}", token));
        self.send_json(Method::GET, path, req).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::POST, path)?.json(body);
        self.send_json(Method::POST, path, req).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::PUT, path)?.json(body);
        self.send_json(Method::PUT, path, req).await
    }

    /// DELETE endpoints answer with plain text or nothing, so the body is
    /// not decoded.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let req = self.request(Method::DELETE, path)?;
        let span = request_span(&Method::DELETE, path);
        async move {
            let res = req.send().await.map_err(log_transport)?;
            check_status(res).await?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http.request(method, self.url(path)?))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        req: RequestBuilder,
    ) -> Result<T> {
        let span = request_span(&method, path);
        async move {
            let res = req.send().await.map_err(log_transport)?;
            let res = check_status(res).await?;
            let bytes = res.bytes().await.map_err(log_transport)?;
            // an empty body reads as `null` so `()` and `Value` targets still decode
            let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            serde_json::from_slice::<T>(body).map_err(|e| {
                warn!(error = %e, "response body did not match the expected shape");
                ClientError::Decode(e)
            })
        }
        .instrument(span)
        .await
    }
}

fn request_span(method: &Method, path: &str) -> tracing::Span {
    tracing::debug_span!("api_request", %method, path, request_id = %Uuid::new_v4())
}

fn log_transport(e: reqwest::Error) -> ClientError {
    warn!(error = %e, "request failed before a response arrived");
    ClientError::Transport(e)
}

async fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        debug!(%status, "response");
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    if status.is_server_error() {
        warn!(%status, %body, "backend error");
    } else {
        debug!(%status, %body, "backend rejected request");
    }
    Err(ClientError::Status { status, body })
}
