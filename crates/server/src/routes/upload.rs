use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use log::info;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::UploadError;

/// URL prefix under which stored uploads are published to the front end.
pub const UPLOADS_URL_PREFIX: &str = "/static/uploads";

pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Reads the first `file` part of a multipart body.
pub async fn read_file_part(multipart: &mut Multipart) -> Result<UploadedFile, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?;
        if file_name.is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        return Ok(UploadedFile { file_name, bytes });
    }
    Err(UploadError::MissingFilePart)
}

/// Client file names are reduced to their final component before storing.
pub fn sanitize_file_name(name: &str) -> Result<String, UploadError> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    if last.is_empty() || last == "." || last == ".." {
        return Err(UploadError::InvalidFilename(name.to_string()));
    }
    Ok(last.to_string())
}

/// Writes an upload into `dir`, creating it when needed.
pub async fn save_upload(dir: &Path, file: &UploadedFile) -> Result<PathBuf, UploadError> {
    let name = sanitize_file_name(&file.file_name)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, &file.bytes).await?;
    info!("Stored upload {} ({} bytes)", path.display(), file.bytes.len());
    Ok(path)
}

pub async fn handler_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, UploadError> {
    let file = read_file_part(&mut multipart).await?;
    let path = save_upload(&state.upload_dir, &file).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Json(json!({ "file_url": format!("{UPLOADS_URL_PREFIX}/{name}") })))
}

pub async fn handler_file_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, UploadError> {
    let file = read_file_part(&mut multipart).await?;
    let path = save_upload(&state.upload_dir, &file).await?;
    Ok(Json(json!({
        "message": "File uploaded successfully",
        "file_path": path.display().to_string(),
    })))
}
