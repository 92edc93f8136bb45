use std::time::Duration;

use async_trait::async_trait;
use davbackup_core::{DavClientOptions, DavError, RemoteEntry, ResourceKind};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, Url};
use tracing::{debug, instrument};

use crate::client::{DavClient, DavClientError};

/// Request timeout applied when the options do not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
  </d:prop>
</d:propfind>"#;

/// One `<d:response>` of a multistatus body.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PropfindEntry {
    href: String,
    kind: ResourceKind,
    size: Option<u64>,
}

/// WebDAV client over `reqwest`.
///
/// Speaks the handful of methods the transport needs (PROPFIND, GET, PUT,
/// MKCOL, DELETE) against a base URL, with optional basic auth.
pub struct HttpDavClient {
    http: ReqwestClient,
    base_url: Url,
    username: Option<String>,
    password: Option<String>,
}

impl std::fmt::Debug for HttpDavClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDavClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl HttpDavClient {
    /// Create a client from options.
    ///
    /// The server URL is required and must be an absolute http(s) URL.
    pub fn new(options: DavClientOptions) -> Result<Self, DavError> {
        let raw = options.server_url.trim();
        if raw.is_empty() {
            return Err(DavError::invalid_path("", "server URL is required"));
        }

        let mut base_url = Url::parse(raw)
            .map_err(|e| DavError::invalid_path(raw, format!("invalid server URL: {}", e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(DavError::invalid_path(
                raw,
                "server URL must use http or https",
            ));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = Duration::from_secs(options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DavError::Network {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url,
            username: options.username,
            password: options.password,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base URL, segment-encoded.
    pub fn url_for(&self, path: &str) -> String {
        let segments: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        let mut url = self.base_url.as_str().to_string();
        url.push_str(&segments.join("/"));
        if path.ends_with('/') && !segments.is_empty() {
            url.push('/');
        }
        url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url_for(path));
        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.as_deref()),
            None => builder,
        }
    }

    /// Send and turn non-success statuses into `DavClientError::Status`.
    async fn send(&self, request: RequestBuilder) -> Result<Response, DavClientError> {
        let response = request.send().await.map_err(request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("WebDAV request failed with status {}: {}", status, body);
        Err(DavClientError::Status {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string(),
        })
    }

    async fn propfind(&self, path: &str, depth: &str) -> Result<Vec<PropfindEntry>, DavClientError> {
        let request = self
            .request(dav_method("PROPFIND")?, path)
            .header("Depth", depth)
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY);

        let response = self.send(request).await?;
        let body = read_utf8(response).await?;
        parse_multistatus(&body)
    }

    /// Path of an href relative to the base URL, decoded, without surrounding `/`.
    fn relative_path(&self, href: &str) -> String {
        let href_path = match Url::parse(href) {
            Ok(url) => url.path().to_string(),
            Err(_) => href.to_string(),
        };
        let decoded = decode(&href_path);
        let base = decode(self.base_url.path());

        decoded
            .strip_prefix(base.as_str())
            .unwrap_or(&decoded)
            .trim_matches('/')
            .to_string()
    }
}

#[async_trait]
impl DavClient for HttpDavClient {
    #[instrument(skip(self), level = "debug")]
    async fn stat(&self, path: &str) -> Result<RemoteEntry, DavClientError> {
        let entry = self
            .propfind(path, "0")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DavClientError::other("PROPFIND response contained no entries"))?;

        Ok(RemoteEntry {
            path: path.trim_matches('/').to_string(),
            kind: entry.kind,
            size: entry.size,
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_text(&self, path: &str) -> Result<String, DavClientError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        let text = read_utf8(response).await?;
        debug!("GET {} ({} bytes)", path, text.len());
        Ok(text)
    }

    #[instrument(skip(self, data), level = "debug", fields(data_len = data.len()))]
    async fn put(&self, path: &str, data: &[u8], overwrite: bool) -> Result<(), DavClientError> {
        let mut request = self
            .request(Method::PUT, path)
            .header(CONTENT_TYPE, "application/json")
            .body(data.to_vec());
        if !overwrite {
            request = request.header("If-None-Match", "*");
        }

        self.send(request).await?;
        debug!("PUT {} ({} bytes)", path, data.len());
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn mkcol(&self, path: &str) -> Result<(), DavClientError> {
        self.send(self.request(dav_method("MKCOL")?, path)).await?;
        debug!("MKCOL {}", path);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, path: &str) -> Result<(), DavClientError> {
        self.send(self.request(Method::DELETE, path)).await?;
        debug!("DELETE {}", path);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, DavClientError> {
        let own_path = path.trim_matches('/');
        let collection = format!("{}/", own_path);
        let entries = self.propfind(&collection, "1").await?;

        let children: Vec<RemoteEntry> = entries
            .into_iter()
            .map(|entry| RemoteEntry {
                path: self.relative_path(&entry.href),
                kind: entry.kind,
                size: entry.size,
            })
            .filter(|entry| entry.path != own_path)
            .collect();

        debug!("Listed {} entries under '{}'", children.len(), own_path);
        Ok(children)
    }
}

fn dav_method(name: &str) -> Result<Method, DavClientError> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| DavClientError::other(format!("invalid HTTP method {}: {}", name, e)))
}

/// Body as strict UTF-8, whatever charset the server declares.
async fn read_utf8(response: Response) -> Result<String, DavClientError> {
    let bytes = response.bytes().await.map_err(request_error)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| DavClientError::other(format!("response body is not valid UTF-8: {}", e)))
}

/// Map a reqwest failure. Connect and timeout failures are tagged as
/// already-classified connection errors; the message keeps the source chain
/// but not the request URL, which must not feed signature matching.
fn request_error(err: reqwest::Error) -> DavClientError {
    let err = err.without_url();
    let message = error_chain(&err);
    if err.is_timeout() || err.is_connect() {
        DavClientError::Classified(DavError::Connection { message })
    } else if err.is_decode() || err.is_builder() {
        DavClientError::Other { message }
    } else {
        DavClientError::Transport { message }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn decode(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn parse_multistatus(xml: &str) -> Result<Vec<PropfindEntry>, DavClientError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| DavClientError::other(format!("invalid PROPFIND response: {}", e)))?;

    let mut entries = Vec::new();
    for response in doc
        .descendants()
        .filter(|node| node.tag_name().name() == "response")
    {
        let Some(href) = response
            .descendants()
            .find(|node| node.tag_name().name() == "href")
            .and_then(|node| node.text())
        else {
            continue;
        };

        let kind = if response
            .descendants()
            .any(|node| node.tag_name().name() == "collection")
        {
            ResourceKind::Directory
        } else {
            ResourceKind::File
        };

        let size = response
            .descendants()
            .find(|node| node.tag_name().name() == "getcontentlength")
            .and_then(|node| node.text())
            .and_then(|text| text.trim().parse::<u64>().ok());

        entries.push(PropfindEntry {
            href: href.trim().to_string(),
            kind,
            size,
        });
    }

    Ok(entries)
}
