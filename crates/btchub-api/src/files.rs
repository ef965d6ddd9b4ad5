use std::path::Path;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use rand::Rng;
use tracing::{error, info};

use btchub_types::api::{UploadResponse, UploadedFile};

use crate::error::ApiError;
use crate::state::AppState;

/// 50 MB upload limit for files
pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024;

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/static/uploads";

const ALLOWED_TYPES: &[&str] = &[
    // Images
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/svg+xml",
    // Videos
    "video/mp4",
    "video/mpeg",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-ms-wmv",
    "video/webm",
    "video/ogg",
    "video/3gpp",
    "video/x-flv",
    // Audio
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
    "audio/mp3",
    "audio/mp4",
];

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::bad_request(e.body_text())
    }
}

/// Lowercased extension of the client's file name, with its dot; empty when
/// absent or not plain alphanumerics.
fn extension(original: &str) -> String {
    Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn stored_name(original: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    format!(
        "meme-{}-{suffix}{}",
        chrono::Utc::now().timestamp_millis(),
        extension(original)
    )
}

/// POST /upload: multipart with a single `file` field.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mimetype = field.content_type().unwrap_or_default().to_string();
        if !ALLOWED_TYPES.contains(&mimetype.as_str()) {
            return Err(ApiError::bad_request(format!("File type {mimetype} not allowed")));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }
        if bytes.len() > MAX_FILE_SIZE {
            return Err(ApiError::PayloadTooLarge);
        }

        // Ensure uploads directory exists
        tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
            error!("Failed to create uploads directory: {}", e);
            anyhow::Error::from(e)
        })?;

        let filename = stored_name(&original_name);
        let file_path = state.upload_dir.join(&filename);
        // Resolves only once the data has been handed to the OS.
        tokio::fs::write(&file_path, &bytes).await.map_err(|e| {
            error!("Failed to write file {}: {}", file_path.display(), e);
            anyhow::Error::from(e)
        })?;

        info!(%filename, size = bytes.len(), "stored upload");
        return Ok(Json(UploadResponse {
            success: true,
            file: UploadedFile {
                url: format!("{PUBLIC_PREFIX}/{filename}"),
                filename,
                original_name,
                mimetype,
                size: bytes.len() as u64,
            },
        }));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(extension("cat.PNG"), ".png");
        assert_eq!(extension("clip.final.mp4"), ".mp4");
        assert_eq!(extension("noext"), "");
        assert_eq!(extension("evil.p/hp"), "");
        assert_eq!(extension("weird.ph p"), "");
    }

    #[test]
    fn stored_names_follow_pattern() {
        let name = stored_name("pepe.gif");
        assert!(name.starts_with("meme-"));
        assert!(name.ends_with(".gif"));
        assert_eq!(name.matches('-').count(), 2);
    }
}
