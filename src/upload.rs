use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::extract::Multipart;
use chrono::Utc;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Multipart part that carries the file.
pub const IMAGE_FIELD: &str = "image";

/// StagedImage
///
/// An uploaded image written to the local upload directory, waiting to be handed
/// to the media host. Callers must [`discard`](StagedImage::discard) it on every path.
#[derive(Debug)]
pub struct StagedImage {
    path: PathBuf,
    content_type: String,
}

impl StagedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub async fn discard(self) {
        if let Err(e) = fs::remove_file(&self.path).await {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to remove staged image");
        }
    }
}

/// ImageForm
///
/// A parsed multipart body: the text fields by name and the optional image part.
#[derive(Debug, Default)]
pub struct ImageForm {
    pub fields: HashMap<String, String>,
    pub image: Option<StagedImage>,
}

impl ImageForm {
    pub fn field(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Removes the staged file, if any.
    pub async fn discard(self) {
        if let Some(image) = self.image {
            image.discard().await;
        }
    }
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; anything else becomes `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// `{millis}-{uuid}-{name}`; the uuid keeps concurrent uploads of the same file
/// name apart.
fn staged_name(original: &str) -> String {
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        sanitize_file_name(original)
    )
}

fn multipart_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart body: {e}"))
}

/// read_image_form
///
/// Drains a multipart body. Text parts are collected into `fields`; the `image`
/// part is streamed to `upload_dir`. Non-image content types and files over
/// [`MAX_IMAGE_BYTES`] are rejected with a 400, and a partially written file is
/// removed before returning.
pub async fn read_image_form(mut multipart: Multipart, upload_dir: &Path) -> ApiResult<ImageForm> {
    let mut form = ImageForm::default();

    loop {
        let next = match multipart.next_field().await {
            Ok(next) => next,
            Err(e) => {
                form.discard().await;
                return Err(multipart_error(e));
            }
        };
        let Some(mut field) = next else { break };

        let name = field.name().unwrap_or_default().to_string();
        if name != IMAGE_FIELD {
            match field.text().await {
                Ok(text) => {
                    form.fields.insert(name, text);
                }
                Err(e) => {
                    form.discard().await;
                    return Err(multipart_error(e));
                }
            }
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image") {
            form.discard().await;
            return Err(ApiError::Validation(
                "Only .png, .jpg and .jpeg format allowed!".to_string(),
            ));
        }

        // A second image part replaces the first.
        if let Some(previous) = form.image.take() {
            previous.discard().await;
        }

        let original = field.file_name().unwrap_or("upload").to_string();
        if let Err(e) = fs::create_dir_all(upload_dir).await {
            form.discard().await;
            return Err(ApiError::Internal(format!("upload dir unavailable: {e}")));
        }
        let staged = StagedImage {
            path: upload_dir.join(staged_name(&original)),
            content_type,
        };

        let written = async {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&staged.path)
                .await
                .map_err(|e| ApiError::Internal(format!("failed to stage upload: {e}")))?;
            let mut total = 0usize;
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                total += chunk.len();
                if total > MAX_IMAGE_BYTES {
                    return Err(ApiError::Validation("File too large".to_string()));
                }
                file.write_all(&chunk)
                    .await
                    .map_err(|e| ApiError::Internal(format!("failed to stage upload: {e}")))?;
            }
            file.flush()
                .await
                .map_err(|e| ApiError::Internal(format!("failed to stage upload: {e}")))?;
            Ok::<_, ApiError>(total)
        }
        .await;

        match written {
            Ok(size) => {
                tracing::debug!(path = %staged.path.display(), size, "image staged");
                form.image = Some(staged);
            }
            Err(e) => {
                staged.discard().await;
                form.discard().await;
                return Err(e);
            }
        }
    }

    Ok(form)
}
