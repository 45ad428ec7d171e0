use std::path::{Component, Path, PathBuf};

use axum::http::HeaderMap;
use bytes::Bytes;
use uuid::Uuid;

pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// URL prefix under which `<upload_dir>/projects` is served.
pub const PUBLIC_PREFIX: &str = "/uploads/projects";

#[derive(Debug)]
pub struct ImageUpload {
    pub file_name: String,
    pub extension: String,
    pub data: Bytes,
    pub caption: String,
    pub is_primary: bool,
}

/// Parse a multipart upload with an `image` file part and optional
/// `caption` and `is_primary` text parts.
pub async fn parse_image_upload(headers: &HeaderMap, body: Bytes) -> Result<ImageUpload, String> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| "Expected multipart/form-data".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut image: Option<(String, Bytes)> = None;
    let mut caption = String::new();
    let mut is_primary = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        match field.name().unwrap_or("") {
            "image" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Field read error: {e}"))?;
                image = Some((file_name, data));
            }
            "caption" => {
                caption = field
                    .text()
                    .await
                    .map_err(|e| format!("Field read error: {e}"))?;
            }
            "is_primary" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| format!("Field read error: {e}"))?;
                is_primary = matches!(value.trim(), "true" | "1" | "on");
            }
            _ => {}
        }
    }

    let (file_name, data) = image.ok_or_else(|| "No image file provided".to_string())?;
    let extension = image_extension(&file_name)?;
    if data.is_empty() {
        return Err("Image file is empty".to_string());
    }
    if data.len() > MAX_IMAGE_SIZE {
        return Err("File too large. Maximum size is 5MB".to_string());
    }

    Ok(ImageUpload {
        file_name,
        extension,
        data,
        caption: caption.trim().chars().take(255).collect(),
        is_primary,
    })
}

/// Lowercased extension of an allowed image file name.
pub fn image_extension(file_name: &str) -> Result<String, String> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(format!(
            "Invalid file type: .{ext}. Allowed: {}",
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        ))
    }
}

pub fn projects_dir(upload_dir: &Path) -> PathBuf {
    upload_dir.join("projects")
}

/// Write an image under `<upload_dir>/projects/<project_id>/` and return the
/// public URL path it will be served from.
pub async fn save_project_image(
    upload_dir: &Path,
    project_id: Uuid,
    upload: &ImageUpload,
) -> Result<String, String> {
    let dir = projects_dir(upload_dir).join(project_id.to_string());
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| format!("Failed to create {}: {e}", dir.display()))?;

    let short_id = &Uuid::new_v4().simple().to_string()[..8];
    let file_name = format!(
        "{short_id}_{}.{}",
        chrono::Utc::now().timestamp(),
        upload.extension
    );
    let path = dir.join(&file_name);
    tokio::fs::write(&path, &upload.data)
        .await
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;

    Ok(format!("{PUBLIC_PREFIX}/{project_id}/{file_name}"))
}

/// Best-effort removal of a previously saved image.
pub async fn remove_project_image(upload_dir: &Path, public_path: &str) {
    let Some(path) = resolve_public_path(upload_dir, public_path) else {
        tracing::warn!(public_path, "Refusing to delete file outside the upload directory");
        return;
    };
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), "Failed to delete image: {e}");
    }
}

fn resolve_public_path(upload_dir: &Path, public_path: &str) -> Option<PathBuf> {
    let relative = public_path.strip_prefix(PUBLIC_PREFIX)?.trim_start_matches('/');
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(projects_dir(upload_dir).join(relative))
}
