// src/media.rs
//! Media download for the root post.
//!
//! Share links are rewritten to direct downloads, the declared content type
//! is checked (only `image/*` and `video/*` pass), and the bytes land in a
//! working directory. The resulting [`DownloadedMedia`] removes its file when
//! dropped, so the temp file is gone on every exit path of a run.

use crate::constants::{DEFAULT_MEDIA_EXTENSION, MEDIA_DOWNLOAD_TIMEOUT};
use crate::error::AppError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

static DRIVE_FILE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("drive id regex is valid"));

static DRIVE_OPEN_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]id=([a-zA-Z0-9_-]+)").expect("drive id regex is valid"));

/// Rewrites a Google Drive share link into its direct-download form.
///
/// URLs that are not Drive links, or Drive links without a recognisable file
/// ID, are returned unchanged.
pub fn convert_drive_url(url: &str) -> String {
    if !url.contains("drive.google.com") {
        return url.to_string();
    }

    let file_id = DRIVE_FILE_ID
        .captures(url)
        .or_else(|| DRIVE_OPEN_ID.captures(url))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    match file_id {
        Some(id) => {
            let download_url = format!("https://drive.google.com/uc?export=download&id={}", id);
            log::info!("Converted Drive URL: {} -> {}", url, download_url);
            download_url
        }
        None => {
            log::warn!("Drive URL has no recognisable file ID: {}", url);
            url.to_string()
        }
    }
}

/// Extension (with leading dot) for a known media content type.
fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/tiff" => ".tiff",
        "image/heic" => ".heic",
        "image/avif" => ".avif",
        "image/svg+xml" => ".svg",
        "video/mp4" => ".mp4",
        "video/quicktime" => ".mov",
        "video/webm" => ".webm",
        "video/x-msvideo" => ".avi",
        "video/x-matroska" => ".mkv",
        "video/mpeg" => ".mpeg",
        "video/3gpp" => ".3gp",
        "video/x-m4v" => ".m4v",
        _ => return None,
    };
    Some(ext)
}

/// The extension in the last path segment of `url`, ignoring query and fragment.
fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let file_name = parsed.path_segments()?.last()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Validates a declared content type and chooses the file extension.
///
/// Fails closed: a missing type, or anything other than `image/*` and
/// `video/*`, is rejected.
pub fn extension_for(content_type: Option<&str>, url: &str) -> Result<String, AppError> {
    let mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::MediaRejected {
            url: url.to_string(),
            reason: "response declared no content type".to_string(),
        })?;

    if !(mime.starts_with("image/") || mime.starts_with("video/")) {
        return Err(AppError::MediaRejected {
            url: url.to_string(),
            reason: format!("content type {} is neither image nor video", mime),
        });
    }

    if let Some(ext) = extension_for_mime(&mime) {
        return Ok(ext.to_string());
    }
    log::warn!("No extension known for {}; trying the URL", mime);
    if let Some(ext) = extension_from_url(url) {
        return Ok(ext);
    }
    log::warn!("URL carries no extension either; using {}", DEFAULT_MEDIA_EXTENSION);
    Ok(DEFAULT_MEDIA_EXTENSION.to_string())
}

/// A downloaded media file that is deleted when this value is dropped.
#[derive(Debug)]
pub struct DownloadedMedia {
    path: PathBuf,
    mime: String,
}

impl DownloadedMedia {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }
}

impl Drop for DownloadedMedia {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::info!("Removed temporary media {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove temporary media {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Writes already-fetched media bytes to `dir/<base><ext>` after validating
/// the content type. Nothing is written when validation fails.
pub fn persist_media(
    dir: &Path,
    file_base: &str,
    content_type: Option<&str>,
    url: &str,
    bytes: &[u8],
) -> Result<DownloadedMedia, AppError> {
    let ext = extension_for(content_type, url)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}{}", file_base, ext));
    std::fs::write(&path, bytes)?;
    Ok(DownloadedMedia {
        path,
        mime: content_type.unwrap_or_default().to_string(),
    })
}

/// Downloads the media at `url` (after Drive conversion) into `dir`.
///
/// Returns `None` on any failure: network error, bad status, rejected
/// content type or write error. The reason is logged. A partially written
/// file is removed before returning.
pub async fn fetch_media(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    file_base: &str,
) -> Option<DownloadedMedia> {
    let download_url = convert_drive_url(url);
    log::info!("Downloading media: {}", download_url);

    match download(client, &download_url, dir, file_base).await {
        Ok(media) => {
            log::info!(
                "Media saved to {} ({})",
                media.path().display(),
                media.mime()
            );
            Some(media)
        }
        Err(e) => {
            log::error!("Media download failed for {}: {}", download_url, e);
            None
        }
    }
}

async fn download(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
    file_base: &str,
) -> Result<DownloadedMedia, AppError> {
    let mut response = client
        .get(url)
        .timeout(MEDIA_DOWNLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    log::info!("Declared content type: {:?}", content_type);

    let ext = extension_for(content_type.as_deref(), url)?;
    tokio::fs::create_dir_all(dir).await?;

    // The guard exists before the first byte is written so a failed
    // transfer still cleans up.
    let media = DownloadedMedia {
        path: dir.join(format!("{}{}", file_base, ext)),
        mime: content_type.unwrap_or_default(),
    };
    let mut file = tokio::fs::File::create(media.path()).await?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(media)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drive_share_link_is_converted() {
        assert_eq!(
            convert_drive_url("https://drive.google.com/file/d/1AbC_d-9/view?usp=sharing"),
            "https://drive.google.com/uc?export=download&id=1AbC_d-9"
        );
        assert_eq!(
            convert_drive_url("https://drive.google.com/open?id=XYZ_123"),
            "https://drive.google.com/uc?export=download&id=XYZ_123"
        );
    }

    #[test]
    fn non_drive_or_idless_urls_are_unchanged() {
        let plain = "https://cdn.example.com/clip.mp4";
        assert_eq!(convert_drive_url(plain), plain);
        let idless = "https://drive.google.com/drive/my-drive";
        assert_eq!(convert_drive_url(idless), idless);
    }

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for(Some("video/mp4"), "https://x/y").unwrap(), ".mp4");
        assert_eq!(
            extension_for(Some("image/png; charset=binary"), "https://x/y").unwrap(),
            ".png"
        );
    }

    #[test]
    fn extension_falls_back_to_url_then_default() {
        assert_eq!(
            extension_for(Some("video/x-flv"), "https://cdn.example.com/a/clip.FLV?sig=1").unwrap(),
            ".flv"
        );
        assert_eq!(
            extension_for(Some("image/x-unknown"), "https://cdn.example.com/raw").unwrap(),
            ".jpg"
        );
        assert_eq!(
            extension_for(Some("image/x-unknown"), "https://cdn.example.com").unwrap(),
            ".jpg"
        );
    }

    #[test]
    fn non_media_types_are_rejected() {
        assert!(matches!(
            extension_for(Some("text/html; charset=utf-8"), "https://x/y"),
            Err(AppError::MediaRejected { .. })
        ));
        assert!(extension_for(None, "https://x/y.mp4").is_err());
    }

    #[test]
    fn persist_rejects_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let result = persist_media(dir.path(), "temp_media", Some("text/html"), "https://x", b"<html>");
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn persisted_media_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let media =
            persist_media(dir.path(), "temp_media", Some("image/jpeg"), "https://x", b"\xFF\xD8")
                .unwrap();
        let path = media.path().to_path_buf();
        assert_eq!(path.file_name().unwrap(), "temp_media.jpg");
        assert!(path.exists());
        drop(media);
        assert!(!path.exists());
    }
}
