//! REST transport for the Fedora repository
//!
//! Implements [`Repository`] on top of reqwest with HTTP basic
//! authentication. Endpoint paths come from `fedora_common::urls`.

use std::time::Duration;

use async_trait::async_trait;
use fedora_common::urls;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::attributes::DsAttribute;
use crate::config::RepositoryConfig;
use crate::content::Content;
use crate::error::{ClientError, Result};
use crate::repository::{DatastreamParams, ProfileQuery, Repository};

/// HTTP client for the Fedora REST API
pub struct HttpRepository {
    client: Client,
    config: RepositoryConfig,
}

impl HttpRepository {
    /// Create a new repository client
    pub fn new(config: RepositoryConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Build full URL from a relative API path
    fn build_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.build_url(path));
        if self.config.username.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.config.username, Some(&self.config.password))
        }
    }

    /// Send a request and map error statuses
    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => {
                debug!("Resource not found: {}", path);
                Err(ClientError::NotFound(path.to_string()))
            }
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized(path.to_string())),
            _ => {
                warn!("Request to {} failed with status {}: {}", path, status, body);
                Err(ClientError::RequestFailed {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Add or modify: parameters travel in the query string, content in the body
    async fn submit(&self, method: Method, params: &DatastreamParams) -> Result<()> {
        let pairs = params.query_pairs();
        let options: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let path = urls::datastream_url(&params.pid, &params.dsid, &options);

        let mut builder = self.request(method.clone(), &path);
        if let Some(content) = &params.content {
            if let Some(mime) = params.attribute(DsAttribute::MimeType) {
                builder = builder.header(reqwest::header::CONTENT_TYPE, mime.to_string());
            }
            builder = builder.body(content.read_all()?);
        }

        debug!(
            "{} datastream {}/{} with {} parameters",
            method,
            params.pid,
            params.dsid,
            params.len()
        );
        self.send(builder, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for HttpRepository {
    fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    fn datastream_content_url(&self, pid: &str, dsid: &str, options: &[(&str, &str)]) -> String {
        self.build_url(&urls::datastream_content_url(pid, dsid, options))
    }

    async fn fetch_datastream_profile(
        &self,
        pid: &str,
        dsid: &str,
        query: &ProfileQuery,
    ) -> Result<String> {
        let pairs = query.query_pairs();
        let mut options: Vec<(&str, &str)> = vec![("format", "xml")];
        options.extend(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        let path = urls::datastream_url(pid, dsid, &options);

        let response = self.send(self.request(Method::GET, &path), &path).await?;
        Ok(response.text().await?)
    }

    async fn fetch_datastream_content(
        &self,
        pid: &str,
        dsid: &str,
        as_of: Option<&str>,
    ) -> Result<Content> {
        let options: Vec<(&str, &str)> = as_of.map(|t| ("asOfDateTime", t)).into_iter().collect();
        let path = urls::datastream_content_url(pid, dsid, &options);

        let response = self.send(self.request(Method::GET, &path), &path).await?;
        Ok(Content::Bytes(response.bytes().await?))
    }

    async fn fetch_datastream_versions(&self, pid: &str, dsid: &str) -> Result<Option<String>> {
        let path = urls::datastream_history_url(pid, dsid, &[("format", "xml")]);

        let response = self.send(self.request(Method::GET, &path), &path).await?;
        let body = response.text().await?;
        Ok(if body.is_empty() { None } else { Some(body) })
    }

    async fn add_datastream(&self, params: &DatastreamParams) -> Result<()> {
        self.submit(Method::POST, params).await
    }

    async fn modify_datastream(&self, params: &DatastreamParams) -> Result<()> {
        self.submit(Method::PUT, params).await
    }

    async fn purge_datastream(&self, pid: &str, dsid: &str) -> Result<()> {
        let path = urls::datastream_url(pid, dsid, &[]);
        debug!("Purging datastream {}/{}", pid, dsid);
        self.send(self.request(Method::DELETE, &path), &path).await?;
        Ok(())
    }
}
