use std::path::Path;
use std::sync::RwLock;

use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use reelpost_upload::{
    ChunkUploader, MULTIPART_MIN_SIZE, ProgressCallback, SDK_VERSION, UPLOADER, UploadError,
    UploadSignature,
};

use crate::ApiError;
use crate::config::Config;
use crate::validation::classify;

/// Rate-limit headers captured from the most recent control-plane response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<String>,
    pub remaining: Option<String>,
    pub reset: Option<String>,
}

/// JSON envelope the signature endpoints wrap their document in.
#[derive(Deserialize)]
struct SignatureEnvelope {
    data: UploadSignature,
}

/// Control-plane REST client.
///
/// Holds no per-upload state; the engine in `reelpost-upload` is created
/// fresh for every [`upload_file`](Self::upload_file) call.
pub struct Client {
    config: Config,
    http: reqwest::Client,
    rate_limit: RwLock<RateLimit>,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            config,
            rate_limit: RwLock::new(RateLimit::default()),
        })
    }

    /// Rate-limit headers from the most recent response.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit.read().unwrap().clone()
    }

    /// GET `endpoint` with query parameters, returning the JSON body.
    pub async fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let request = self.http.get(self.endpoint_url(endpoint)).query(query);
        let response = self.send(endpoint, request).await?;
        Ok(serde_json::from_str(&response)?)
    }

    /// POST a JSON `body` to `endpoint`, returning the JSON response.
    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ApiError> {
        let request = self.http.post(self.endpoint_url(endpoint)).json(body);
        let response = self.send(endpoint, request).await?;
        Ok(serde_json::from_str(&response)?)
    }

    /// PATCH a JSON `body` to `endpoint`, returning the JSON response.
    pub async fn patch(&self, endpoint: &str, body: &Value) -> Result<Value, ApiError> {
        let request = self.http.patch(self.endpoint_url(endpoint)).json(body);
        let response = self.send(endpoint, request).await?;
        Ok(serde_json::from_str(&response)?)
    }

    /// DELETE `endpoint`. Completing without error is the success signal;
    /// the API answers with an empty 204.
    pub async fn delete(&self, endpoint: &str) -> Result<(), ApiError> {
        let request = self.http.delete(self.endpoint_url(endpoint));
        self.send(endpoint, request).await?;
        Ok(())
    }

    /// Requests a single-request upload signature for a file.
    pub async fn single_signature(
        &self,
        file_name: &str,
        file_size: u64,
    ) -> Result<UploadSignature, ApiError> {
        self.signature("single", file_name, file_size).await
    }

    /// Requests a chunked upload signature for a file.
    pub async fn multipart_signature(
        &self,
        file_name: &str,
        file_size: u64,
    ) -> Result<UploadSignature, ApiError> {
        self.signature("multipart", file_name, file_size).await
    }

    /// Uploads `path` end to end: requests a signature sized to the file,
    /// then drives the upload engine against the storage endpoint.
    ///
    /// Nothing is retried or rolled back; any failure surfaces immediately
    /// and the caller decides whether to restart from scratch.
    pub async fn upload_file(
        &self,
        path: &Path,
        on_progress: Option<ProgressCallback>,
    ) -> Result<(), ApiError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|_| {
            UploadError::Configuration(format!("file not found: {}", path.display()))
        })?;
        let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
            UploadError::Configuration(format!("invalid file name: {}", path.display()))
        })?;

        let signature = if metadata.len() < MULTIPART_MIN_SIZE {
            self.single_signature(file_name, metadata.len()).await?
        } else {
            self.multipart_signature(file_name, metadata.len()).await?
        };

        let uploader = ChunkUploader::new(self.http.clone());
        if let Some(callback) = on_progress {
            uploader.on_progress(callback);
        }
        uploader.upload(path, &signature).await?;
        Ok(())
    }

    async fn signature(
        &self,
        kind: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<UploadSignature, ApiError> {
        let uploader = format!("{UPLOADER} {SDK_VERSION}");
        let size = file_size.to_string();
        let value = self
            .get(
                &format!("signature/{kind}"),
                &[
                    ("filename", file_name),
                    ("filesize", size.as_str()),
                    ("uploader", uploader.as_str()),
                ],
            )
            .await?;
        let envelope: SignatureEnvelope = serde_json::from_value(value)?;
        Ok(envelope.data)
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.version,
            endpoint
        )
    }

    /// Injects auth, sends, records rate-limit headers, and classifies the
    /// response.
    async fn send(
        &self,
        endpoint: &str,
        mut request: reqwest::RequestBuilder,
    ) -> Result<String, ApiError> {
        if self.config.url_auth {
            request = request.query(&[
                ("client_id", self.config.client_id.as_str()),
                ("auth_token", self.config.auth_token.as_str()),
            ]);
        } else {
            request = request
                .header("X-Client-Id", &self.config.client_id)
                .header("X-Auth-Token", &self.config.auth_token);
        }

        debug!(endpoint, "sending API request");
        let response = request.send().await?;

        *self.rate_limit.write().unwrap() = rate_limit_snapshot(response.headers());

        let status = response.status();
        let body = response.text().await?;
        classify(status, body)
    }
}

fn rate_limit_snapshot(headers: &HeaderMap) -> RateLimit {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    RateLimit {
        limit: value("X-RateLimit-Limit"),
        remaining: value("X-RateLimit-Remaining"),
        reset: value("X-RateLimit-Reset"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path as url_path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> Client {
        Client::new(Config {
            base_url: server.uri(),
            client_id: "client-1".into(),
            auth_token: "secret".into(),
            ..Config::default()
        })
        .unwrap()
    }

    fn signature_json(upload_host: &str, chunked: bool) -> String {
        // 2 MiB parts: a 5 MiB file splits into three units of 2, 2, and 1 MiB.
        let chunking = if chunked {
            r#","parts": 3, "part_size_in_bytes": 2097152"#
        } else {
            ""
        };
        format!(
            r#"{{"data": {{
                "upload_hostname": "{upload_host}",
                "access_key_id": "AKIATEST",
                "signature": "c2lnbmVk",
                "acl": "private",
                "bucket": "bucket",
                "policy": "cG9saWN5",
                "success_action_status": "201",
                "key": "videos/${{filename}}/orig"{chunking}
            }}}}"#
        )
    }

    #[tokio::test]
    async fn sends_header_auth_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/v2/videos"))
            .and(header("X-Client-Id", "client-1"))
            .and(header("X-Auth-Token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let body = client.get("videos", &[]).await.unwrap();
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn url_auth_sends_query_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/v2/videos"))
            .and(query_param("client_id", "client-1"))
            .and(query_param("auth_token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::new(Config {
            base_url: server.uri(),
            client_id: "client-1".into(),
            auth_token: "secret".into(),
            url_auth: true,
            ..Config::default()
        })
        .unwrap();
        client.get("videos", &[]).await.unwrap();
    }

    #[tokio::test]
    async fn captures_rate_limit_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .insert_header("X-RateLimit-Limit", "200")
                    .insert_header("X-RateLimit-Remaining", "199")
                    .insert_header("X-RateLimit-Reset", "1469029960"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.rate_limit(), RateLimit::default());

        client.get("videos", &[]).await.unwrap();
        let limits = client.rate_limit();
        assert_eq!(limits.limit.as_deref(), Some("200"));
        assert_eq!(limits.remaining.as_deref(), Some("199"));
        assert_eq!(limits.reset.as_deref(), Some("1469029960"));
    }

    #[tokio::test]
    async fn recognized_error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get("videos", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn unmapped_status_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(418))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get("videos", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Unknown { status: 418, .. }));
    }

    #[tokio::test]
    async fn delete_succeeds_on_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(url_path("/v2/videos/42"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete("videos/42").await.unwrap();
    }

    #[tokio::test]
    async fn signature_endpoint_parses_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/v2/signature/single"))
            .and(query_param("filename", "movie.mp4"))
            .and(query_param("filesize", "1000"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(signature_json("https://storage.example.com", false)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let signature = client.single_signature("movie.mp4", 1000).await.unwrap();
        assert_eq!(signature.bucket, "bucket");
        assert!(!signature.is_chunked());
    }

    #[tokio::test]
    async fn upload_file_runs_single_flow_end_to_end() {
        let storage = MockServer::start().await;
        Mock::given(method("POST"))
            .and(url_path("/"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&storage)
            .await;

        // Small file, so the client must request a single signature.
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/v2/signature/single"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(signature_json(&storage.uri(), false)),
            )
            .expect(1)
            .mount(&api)
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movie.mp4");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"tiny video")
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let client = client_for(&api);
        client
            .upload_file(
                &path,
                Some(Box::new(move |e| sink.lock().unwrap().push(e))),
            )
            .await
            .unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].total_parts, 1);
        assert_eq!(events[0].completed_index, 0);
    }

    #[tokio::test]
    async fn upload_file_picks_multipart_at_threshold() {
        let storage = MockServer::start().await;
        Mock::given(method("POST"))
            .and(url_path("/"))
            .respond_with(ResponseTemplate::new(201))
            .expect(3)
            .mount(&storage)
            .await;

        // Exactly 5 MiB, so the client must request a multipart signature.
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/v2/signature/multipart"))
            .and(query_param("filesize", MULTIPART_MIN_SIZE.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(signature_json(&storage.uri(), true)),
            )
            .expect(1)
            .mount(&api)
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movie.mp4");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&vec![0xA5u8; MULTIPART_MIN_SIZE as usize])
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let client = client_for(&api);
        client
            .upload_file(
                &path,
                Some(Box::new(move |e| sink.lock().unwrap().push(e))),
            )
            .await
            .unwrap();

        let events = seen.lock().unwrap();
        let indices: Vec<u64> = events.iter().map(|e| e.completed_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(events.iter().all(|e| e.total_parts == 3));
    }

    #[tokio::test]
    async fn upload_file_missing_file_makes_no_requests() {
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&api)
            .await;

        let client = client_for(&api);
        let err = client
            .upload_file(Path::new("/no/such/file.mp4"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Upload(UploadError::Configuration(_))
        ));
    }
}
