//! Upload of a finished backup tree to an object store.
//!
//! The tree is uploaded file by file with `PUT {endpoint}/{bucket}/{prefix}/{path}`,
//! which is understood by S3-compatible gateways and most bucket HTTP APIs.
//! Local files are never touched, so a failed upload can simply be repeated
//! with `spotback upload`.

use std::{
    future::Future,
    path::{Path, PathBuf},
};

use indicatif::ProgressBar;
use reqwest::{Client, StatusCode, Url, header::CONTENT_TYPE};
use walkdir::WalkDir;

use crate::{error::BackupError, spotify::pager::RetryPolicy, warning};

/// Something that can store a local directory tree under a bucket prefix.
pub trait Uploader {
    /// Uploads every file below `local_dir`; returns the uploaded keys.
    fn upload(
        &self,
        local_dir: &Path,
        bucket: &str,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<String>, BackupError>> + Send;
}

/// Object store reached over plain HTTP.
pub struct HttpObjectStore {
    http: Client,
    endpoint: String,
    token: Option<String>,
    policy: RetryPolicy,
    progress: Option<ProgressBar>,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        HttpObjectStore {
            http: Client::new(),
            endpoint: endpoint.into(),
            token,
            policy: RetryPolicy::default(),
            progress: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Advances `progress` by one for every uploaded file.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// URL of `key` in `bucket`; every path segment is percent-encoded.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, BackupError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| BackupError::Config(format!("invalid object store URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| BackupError::Config("object store URL cannot have a path".to_string()))?
            .pop_if_empty()
            .push(bucket)
            .extend(key.split('/'));
        Ok(url)
    }

    async fn put_with_retry(&self, url: Url, key: &str, body: Vec<u8>) -> Result<(), BackupError> {
        let mut retries = 0;
        loop {
            let mut request = self
                .http
                .put(url.clone())
                .header(CONTENT_TYPE, "text/csv")
                .body(body.clone());
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let reason = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status();
                    if status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error() {
                        return Err(BackupError::Upload {
                            key: key.to_string(),
                            reason: format!("rejected with HTTP {status}"),
                        });
                    }
                    format!("HTTP {status}")
                }
                Err(e) => e.to_string(),
            };

            retries += 1;
            if retries > self.policy.max_retries {
                return Err(BackupError::Upload {
                    key: key.to_string(),
                    reason,
                });
            }
            let wait = self.policy.backoff(retries);
            warning!(
                "Upload of {} failed ({}), retrying in {}ms ({}/{})",
                key,
                reason,
                wait.as_millis(),
                retries,
                self.policy.max_retries
            );
            tokio::time::sleep(wait).await;
        }
    }
}

impl Uploader for HttpObjectStore {
    async fn upload(
        &self,
        local_dir: &Path,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, BackupError> {
        let files = collect_files(local_dir)?;
        if let Some(pb) = &self.progress {
            pb.set_length(files.len() as u64);
        }

        let mut keys = Vec::with_capacity(files.len());
        for (path, relative) in files {
            let key = object_key(prefix, &relative);
            let body = read_object(&path, &key).await?;
            let url = self.object_url(bucket, &key)?;
            self.put_with_retry(url, &key, body).await?;

            if let Some(pb) = &self.progress {
                pb.set_message(key.clone());
                pb.inc(1);
            }
            keys.push(key);
        }
        Ok(keys)
    }
}

/// Files below `root` in a stable order, with their `/`-separated relative
/// paths. Leftover `.partial` files are ignored.
fn collect_files(root: &Path) -> Result<Vec<(PathBuf, String)>, BackupError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| BackupError::Upload {
            key: e.path().unwrap_or(root).display().to_string(),
            reason: format!("cannot list local files: {e}"),
        })?;
        if !entry.file_type().is_file() || entry.path().extension().is_some_and(|e| e == "partial")
        {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.push((entry.path().to_path_buf(), relative));
    }
    Ok(files)
}

/// Reads the local file that is uploaded as `key`.
pub async fn read_object(path: &Path, key: &str) -> Result<Vec<u8>, BackupError> {
    async_fs::read(path)
        .await
        .map_err(|e| BackupError::Upload {
            key: key.to_string(),
            reason: format!("cannot read {}: {e}", path.display()),
        })
}

/// Joins the bucket prefix and a relative path into an object key.
pub fn object_key(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{prefix}/{relative}")
    }
}
