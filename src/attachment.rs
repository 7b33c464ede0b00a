//! Attachment handling: validate the declared type, then fetch the bytes.
//!
//! Chat platforms hand us a URL plus a declared content type. The type is
//! checked against the allow-list *before* any network traffic, so a rejected
//! upload costs nothing. Local paths are accepted too (the terminal front-end
//! uses them).

use crate::config::BotConfig;
use crate::error::BotError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// A file attached to an incoming chat message, not yet downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// `http(s)://` URL or local file path.
    pub url: String,
    /// MIME type declared by the platform, if any.
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

impl AttachmentRef {
    /// Build a reference to a local file, guessing its type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            url: path.display().to_string(),
            content_type: guess_mime_from_path(path).map(str::to_string),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
        }
    }
}

/// Downloaded attachment bytes with their normalised MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Attachment {
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Self {
        Self {
            bytes,
            mime_type: normalize_mime(mime_type),
        }
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Lower-case the type, drop parameters, and fold `image/jpg` into `image/jpeg`.
pub fn normalize_mime(mime: &str) -> String {
    let base = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if base == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        base
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// MIME type for the extensions the bot accepts.
pub fn guess_mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Reject attachments whose declared type is not allowed.
///
/// A missing content type is reported as `unknown`.
pub fn check_mime(attachment: &AttachmentRef, config: &BotConfig) -> Result<String, BotError> {
    match attachment.content_type.as_deref() {
        Some(mime) if config.is_mime_allowed(&mime_base(mime)) => Ok(normalize_mime(mime)),
        Some(mime) => Err(BotError::UnsupportedAttachment {
            mime: mime.to_string(),
        }),
        None => Err(BotError::UnsupportedAttachment {
            mime: "unknown".to_string(),
        }),
    }
}

fn mime_base(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_string()
}

/// Validate and fetch an attachment.
pub async fn fetch_attachment(
    attachment: &AttachmentRef,
    config: &BotConfig,
) -> Result<Attachment, BotError> {
    let mime = check_mime(attachment, config)?;
    let bytes = if is_url(&attachment.url) {
        download_bytes(&attachment.url, config.download_timeout_secs).await?
    } else {
        read_local(&attachment.url).await?
    };
    debug!("Fetched attachment: {} bytes of {}", bytes.len(), mime);
    Ok(Attachment { bytes, mime_type: mime })
}

async fn read_local(path: &str) -> Result<Vec<u8>, BotError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| BotError::DownloadFailed {
            url: path.to_string(),
            reason: e.to_string(),
        })
}

/// Download a URL into memory.
async fn download_bytes(url: &str, timeout_secs: u64) -> Result<Vec<u8>, BotError> {
    info!("Downloading attachment from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BotError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            BotError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            BotError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(BotError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_send_err)?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_ref(url: String) -> AttachmentRef {
        AttachmentRef {
            url,
            content_type: Some("image/png".into()),
            filename: Some("sheet.png".into()),
        }
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://cdn.example/a.png"));
        assert!(is_url("http://localhost/a.pdf"));
        assert!(!is_url("/tmp/a.png"));
        assert!(!is_url("ftp://host/a.png"));
    }

    #[test]
    fn jpg_is_normalised() {
        assert_eq!(normalize_mime("image/jpg"), "image/jpeg");
        assert_eq!(normalize_mime("IMAGE/PNG; q=1"), "image/png");
    }

    #[test]
    fn guesses_from_extension() {
        assert_eq!(guess_mime_from_path(Path::new("a.PDF")), Some("application/pdf"));
        assert_eq!(guess_mime_from_path(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(guess_mime_from_path(Path::new("a.txt")), None);
        assert_eq!(guess_mime_from_path(Path::new("noext")), None);
    }

    #[test]
    fn mime_check_rejects_text() {
        let config = BotConfig::default();
        let a = AttachmentRef {
            url: "https://x/a.txt".into(),
            content_type: Some("text/plain".into()),
            filename: None,
        };
        let err = check_mime(&a, &config).unwrap_err();
        assert!(matches!(err, BotError::UnsupportedAttachment { ref mime } if mime == "text/plain"));
    }

    #[test]
    fn mime_check_reports_unknown() {
        let config = BotConfig::default();
        let a = AttachmentRef {
            url: "https://x/a".into(),
            content_type: None,
            filename: None,
        };
        assert!(matches!(
            check_mime(&a, &config),
            Err(BotError::UnsupportedAttachment { ref mime }) if mime == "unknown"
        ));
    }

    #[tokio::test]
    async fn downloads_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sheet.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .mount(&server)
            .await;

        let config = BotConfig::default();
        let a = png_ref(format!("{}/sheet.png", server.uri()));
        let fetched = fetch_attachment(&a, &config).await.unwrap();
        assert_eq!(fetched.bytes, vec![0x89, b'P', b'N', b'G']);
        assert_eq!(fetched.mime_type, "image/png");
    }

    #[tokio::test]
    async fn http_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let config = BotConfig::default();
        let a = png_ref(format!("{}/missing.png", server.uri()));
        let err = fetch_attachment(&a, &config).await.unwrap_err();
        assert!(matches!(err, BotError::DownloadFailed { ref reason, .. } if reason.contains("404")));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let config = BotConfig::builder().download_timeout_secs(1).build().unwrap();
        let a = png_ref(format!("{}/slow.png", server.uri()));
        let err = fetch_attachment(&a, &config).await.unwrap_err();
        assert!(matches!(err, BotError::DownloadTimeout { secs: 1, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn rejected_type_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = BotConfig::default();
        let a = AttachmentRef {
            url: format!("{}/notes.txt", server.uri()),
            content_type: Some("text/plain".into()),
            filename: None,
        };
        assert!(fetch_attachment(&a, &config).await.is_err());
    }

    #[tokio::test]
    async fn reads_local_files() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.7").unwrap();
        let a = AttachmentRef::from_path(file.path());
        assert_eq!(a.content_type.as_deref(), Some("application/pdf"));

        let fetched = fetch_attachment(&a, &BotConfig::default()).await.unwrap();
        assert_eq!(fetched.bytes, b"%PDF-1.7");
    }
}
