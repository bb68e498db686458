//! Raw dataset download over HTTP
//!
//! Plain URLs are fetched with a single GET and saved under their last path
//! segment. Cloud-drive share links are resolved to the drive's direct
//! download endpoint and saved as `insurance.csv`.

use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// File name used for cloud-drive downloads
pub const DRIVE_FILE_NAME: &str = "insurance.csv";

/// Direct download endpoint of the cloud drive
pub const DRIVE_ENDPOINT: &str = "https://drive.google.com/uc";

const DRIVE_HOSTS: [&str; 2] = ["drive.google.com", "docs.google.com"];

/// Errors from the download layer
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("URL '{0}' has no file name in its last path segment")]
    NoFileName(String),

    #[error("no file id in cloud-drive link '{0}'")]
    NoDriveFileId(String),

    #[error("cloud drive returned a page without a download token for file '{0}'")]
    MissingConfirmToken(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("GET {0} returned an empty body")]
    EmptyBody(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// HTTP client for raw dataset downloads
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    drive_endpoint: String,
}

impl Downloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            drive_endpoint: DRIVE_ENDPOINT.to_string(),
        }
    }

    /// Point cloud-drive downloads at another endpoint
    pub fn with_drive_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.drive_endpoint = endpoint.into();
        self
    }

    /// Download `url` into `dir`, returning the written file
    pub async fn download(&self, url: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
        let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DownloadError::io(dir, e))?;

        let (destination, bytes) = if is_cloud_drive_url(&parsed) {
            let file_id = drive_file_id(&parsed).ok_or_else(|| DownloadError::NoDriveFileId(url.to_string()))?;
            let destination = dir.join(DRIVE_FILE_NAME);
            tracing::info!(url, file_id = %file_id, "downloading from cloud drive");
            let bytes = self.fetch_drive_file(&file_id, &destination).await?;
            (destination, bytes)
        } else {
            let destination = dir.join(file_name_from_url(&parsed)?);
            tracing::info!(url, "downloading");
            let response = ensure_success(self.client.get(parsed).send().await?)?;
            let bytes = write_body(response, &destination).await?;
            (destination, bytes)
        };

        if bytes == 0 {
            return Err(DownloadError::EmptyBody(url.to_string()));
        }

        tracing::info!(path = %destination.display(), bytes, "download finished");
        Ok(destination)
    }

    async fn fetch_drive_file(&self, file_id: &str, destination: &Path) -> Result<u64, DownloadError> {
        let url = self.drive_url(file_id, None)?;
        let response = ensure_success(self.client.get(url).send().await?)?;

        if !is_html(&response) {
            return write_body(response, destination).await;
        }

        // Large files get an interstitial page that carries a confirm token
        let page = response.text().await?;
        let token = confirm_token(&page).ok_or_else(|| DownloadError::MissingConfirmToken(file_id.to_string()))?;
        tracing::debug!(file_id, "retrying cloud-drive download with confirm token");

        let url = self.drive_url(file_id, Some(&token))?;
        let response = ensure_success(self.client.get(url).send().await?)?;
        write_body(response, destination).await
    }

    fn drive_url(&self, file_id: &str, confirm: Option<&str>) -> Result<Url, DownloadError> {
        let mut params = vec![("export", "download"), ("id", file_id)];
        if let Some(token) = confirm {
            params.push(("confirm", token));
        }
        Url::parse_with_params(&self.drive_endpoint, &params).map_err(|e| DownloadError::InvalidUrl {
            url: self.drive_endpoint.clone(),
            reason: e.to_string(),
        })
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the URL is a cloud-drive share link
pub fn is_cloud_drive_url(url: &Url) -> bool {
    url.host_str()
        .map(|host| DRIVE_HOSTS.contains(&host))
        .unwrap_or(false)
}

/// File id of a share link: `/file/d/<id>/...`, `/d/<id>` or `?id=<id>`
pub fn drive_file_id(url: &Url) -> Option<String> {
    if let Some(segments) = url.path_segments() {
        let segments: Vec<&str> = segments.collect();
        if let Some(pos) = segments.iter().position(|s| *s == "d") {
            if let Some(id) = segments.get(pos + 1).filter(|id| !id.is_empty()) {
                return Some(id.to_string());
            }
        }
    }

    url.query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

/// Last non-empty path segment of a plain URL
pub fn file_name_from_url(url: &Url) -> Result<String, DownloadError> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| DownloadError::NoFileName(url.to_string()))
}

/// Confirm token of a cloud-drive interstitial page
pub fn confirm_token(page: &str) -> Option<String> {
    let patterns = [
        r"confirm=([0-9A-Za-z_\-]+)",
        r#"name="confirm"\s+value="([0-9A-Za-z_\-]+)""#,
    ];
    patterns.iter().find_map(|pattern| {
        let re = Regex::new(pattern).ok()?;
        re.captures(page)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn is_html(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("text/html"))
        .unwrap_or(false)
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DownloadError> {
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

/// Stream the response body into `destination`
async fn write_body(mut response: reqwest::Response, destination: &Path) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(|e| DownloadError::io(destination, e))?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| DownloadError::io(destination, e))?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_cloud_drive_dispatch() {
        assert!(is_cloud_drive_url(&url("https://drive.google.com/file/d/abc/view")));
        assert!(is_cloud_drive_url(&url("https://docs.google.com/uc?id=abc")));
        assert!(!is_cloud_drive_url(&url("https://example.com/data/insurance.csv")));
        assert!(!is_cloud_drive_url(&url("https://drive.google.com.evil.io/insurance.csv")));
    }

    #[test]
    fn test_drive_file_id() {
        assert_eq!(
            drive_file_id(&url("https://drive.google.com/file/d/1AbC-x_9/view?usp=sharing")),
            Some("1AbC-x_9".to_string())
        );
        assert_eq!(
            drive_file_id(&url("https://drive.google.com/open?id=XYZ")),
            Some("XYZ".to_string())
        );
        assert_eq!(drive_file_id(&url("https://drive.google.com/drive/my-drive")), None);
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url(&url("https://example.com/datasets/insurance.csv?raw=true")).unwrap(),
            "insurance.csv"
        );
        assert!(matches!(
            file_name_from_url(&url("https://example.com/datasets/")),
            Err(DownloadError::NoFileName(_))
        ));
        assert!(file_name_from_url(&url("https://example.com")).is_err());
    }

    #[test]
    fn test_confirm_token() {
        let page = r#"<a href="/uc?export=download&amp;confirm=t0K-en_1&amp;id=abc">Download anyway</a>"#;
        assert_eq!(confirm_token(page), Some("t0K-en_1".to_string()));

        let form = r#"<input type="hidden" name="confirm" value="t">"#;
        assert_eq!(confirm_token(form), Some("t".to_string()));

        assert_eq!(confirm_token("<html>quota exceeded</html>"), None);
    }

    #[test]
    fn test_drive_url() {
        let downloader = Downloader::new();
        let url = downloader.drive_url("abc", Some("tok")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://drive.google.com/uc?export=download&id=abc&confirm=tok"
        );
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let dir = tempfile::tempdir().unwrap();
        let result = Downloader::new().download("not a url", dir.path()).await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
