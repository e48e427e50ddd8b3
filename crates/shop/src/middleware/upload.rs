//! Single-file image upload stage.
//!
//! For `multipart/form-data` requests the stage consumes the body:
//!
//! - the field named `image` is streamed to `<image_dir>/<uuid>-<name>` when its
//!   declared MIME type is png, jpg or jpeg, and an [`UploadedImage`] is
//!   attached to the request;
//! - an `image` part with a disallowed type, or with an empty file name, is
//!   dropped without error;
//! - a file under any other field name, or a second `image` file, fails the
//!   request with [`UploadError::UnexpectedFile`];
//! - every text field is re-encoded as `application/x-www-form-urlencoded`, so
//!   the CSRF guard and `Form` extractors downstream see an ordinary form.
//!
//! All other requests pass through untouched.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Name of the multipart field that carries the product image.
pub const IMAGE_FIELD: &str = "image";

/// URL prefix under which stored images are served.
pub const IMAGE_URL_PREFIX: &str = "/images";

const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];

/// Errors raised while consuming a multipart body.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
    #[error("failed to store uploaded file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected file field: {0}")]
    UnexpectedFile(String),
}

/// An accepted image, already written to the image directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Location on disk.
    pub path: PathBuf,
    /// File name as sent by the client.
    pub original_name: String,
    /// Declared MIME type, lowercased.
    pub content_type: String,
    /// Bytes written.
    pub size: u64,
}

impl UploadedImage {
    /// Path under which the image is publicly served, e.g. `/images/<file>`.
    #[must_use]
    pub fn public_path(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{IMAGE_URL_PREFIX}/{file_name}")
    }

    /// Remove the stored file. Failures are logged, not returned.
    pub async fn discard(&self) {
        remove_logged(&self.path).await;
    }
}

/// Extractor for the optional upload attached by [`handle_upload`].
///
/// `None` covers both "no file sent" and "file rejected".
#[derive(Debug, Clone)]
pub struct MaybeImage(pub Option<UploadedImage>);

impl<S> FromRequestParts<S> for MaybeImage
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<UploadedImage>().cloned()))
    }
}

/// Whether a declared content type is on the image allow-list.
///
/// Parameters such as `; charset=...` are ignored and the comparison is
/// case-insensitive.
#[must_use]
pub fn is_allowed_image_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_IMAGE_TYPES.contains(&essence.as_str())
}

/// Build the stored file name: a fresh UUID joined to the final path
/// component of the client-supplied name.
#[must_use]
pub fn stored_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or("upload");
    format!("{}-{base}", Uuid::new_v4())
}

/// Remove a stored image given its public path. Failures are logged, not returned.
pub async fn delete_image(image_dir: &Path, public_path: &str) {
    let Some(file_name) = Path::new(public_path).file_name() else {
        return;
    };
    remove_logged(&image_dir.join(file_name)).await;
}

async fn remove_logged(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to delete image");
    }
}

/// Encode text fields as an `application/x-www-form-urlencoded` body.
fn encode_form(fields: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}

fn multipart_boundary(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    multer::parse_boundary(content_type).ok()
}

/// Middleware that turns a multipart body into a stored image plus a urlencoded form.
///
/// # Errors
///
/// Returns `AppError::Upload` if the body is not valid multipart or the file
/// cannot be written.
pub async fn handle_upload(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(boundary) = multipart_boundary(request.headers()) else {
        return Ok(next.run(request).await);
    };

    let (mut parts, body) = request.into_parts();
    let multipart = multer::Multipart::new(body.into_data_stream(), boundary);
    let mut image = None;

    let fields = match read_fields(multipart, &state.config().image_dir, &mut image).await {
        Ok(fields) => fields,
        Err(e) => {
            if let Some(image) = &image {
                image.discard().await;
            }
            return Err(e.into());
        }
    };

    let encoded = encode_form(&fields);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(encoded.len()));
    if let Some(image) = image {
        parts.extensions.insert(image);
    }

    Ok(next.run(Request::from_parts(parts, Body::from(encoded))).await)
}

/// Consume every part: the image goes to disk, text fields are returned in order.
///
/// A stored image is left in `image` even when a later part fails, so the
/// caller can remove it.
async fn read_fields(
    mut multipart: multer::Multipart<'static>,
    image_dir: &Path,
    image: &mut Option<UploadedImage>,
) -> Result<Vec<(String, String)>, UploadError> {
    let mut fields = Vec::new();
    let mut seen_image = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name() {
            None => {
                let value = field.text().await?;
                fields.push((name, value));
            }
            // Browsers send an empty file part when no file was chosen.
            Some("") => {}
            Some(_) if name != IMAGE_FIELD || seen_image => {
                return Err(UploadError::UnexpectedFile(name));
            }
            Some(_) => {
                seen_image = true;
                *image = store_image(field, image_dir).await?;
            }
        }
    }

    Ok(fields)
}

/// Write an accepted image field to disk. Returns `None` if the field is rejected.
async fn store_image(
    mut field: multer::Field<'static>,
    image_dir: &Path,
) -> Result<Option<UploadedImage>, UploadError> {
    let Some(original_name) = field.file_name().map(String::from) else {
        return Ok(None);
    };
    let content_type = field
        .content_type()
        .map(|mime| mime.essence_str().to_ascii_lowercase())
        .unwrap_or_default();

    if !is_allowed_image_type(&content_type) {
        tracing::debug!(%content_type, file = %original_name, "Rejected upload");
        return Ok(None);
    }

    tokio::fs::create_dir_all(image_dir).await?;
    let path = image_dir.join(stored_file_name(&original_name));
    let mut file = tokio::fs::File::create(&path).await?;
    let mut size = 0u64;

    let written: Result<(), UploadError> = async {
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }
    .await;

    if let Err(e) = written {
        drop(file);
        remove_logged(&path).await;
        return Err(e);
    }

    tracing::info!(path = %path.display(), size, "Stored uploaded image");
    Ok(Some(UploadedImage {
        path,
        original_name,
        content_type,
        size,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_image_types() {
        assert!(is_allowed_image_type("image/png"));
        assert!(is_allowed_image_type("image/jpg"));
        assert!(is_allowed_image_type("image/jpeg"));
        assert!(is_allowed_image_type("IMAGE/PNG"));
        assert!(is_allowed_image_type("image/jpeg; charset=binary"));
    }

    #[test]
    fn test_disallowed_image_types() {
        assert!(!is_allowed_image_type("image/gif"));
        assert!(!is_allowed_image_type("image/svg+xml"));
        assert!(!is_allowed_image_type("text/plain"));
        assert!(!is_allowed_image_type("application/octet-stream"));
        assert!(!is_allowed_image_type(""));
    }

    #[test]
    fn test_stored_file_name_keeps_only_basename() {
        let name = stored_file_name("../../etc/passwd");
        assert!(name.ends_with("-passwd"));
        assert!(!name.contains('/'));

        let name = stored_file_name(r"C:\Users\me\photo.png");
        assert!(name.ends_with("-photo.png"));
    }

    #[test]
    fn test_stored_file_name_is_unique() {
        assert_ne!(stored_file_name("a.png"), stored_file_name("a.png"));
    }

    #[test]
    fn test_stored_file_name_falls_back_for_empty_names() {
        assert!(stored_file_name("").ends_with("-upload"));
        assert!(stored_file_name("dir/..").ends_with("-upload"));
    }

    #[test]
    fn test_encode_form_escapes_values() {
        let fields = vec![
            ("_csrf".to_string(), "a+b/c".to_string()),
            ("title".to_string(), "Blue Mug & Saucer".to_string()),
        ];
        assert_eq!(
            encode_form(&fields),
            "_csrf=a%2Bb%2Fc&title=Blue+Mug+%26+Saucer"
        );
        assert_eq!(encode_form(&[]), "");
    }

    fn multipart_body(parts: &[(&str, Option<(&str, &str)>, &str)]) -> Body {
        let mut body = String::new();
        for (name, file, value) in parts {
            body.push_str("--XBOUNDARY\r\n");
            match file {
                Some((file_name, mime)) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: {mime}\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str("--XBOUNDARY--\r\n");
        Body::from(body)
    }

    async fn read(
        parts: &[(&str, Option<(&str, &str)>, &str)],
        image_dir: &Path,
    ) -> (
        Result<Vec<(String, String)>, UploadError>,
        Option<UploadedImage>,
    ) {
        let multipart = multer::Multipart::new(
            multipart_body(parts).into_data_stream(),
            "XBOUNDARY",
        );
        let mut image = None;
        let result = read_fields(multipart, image_dir, &mut image).await;
        (result, image)
    }

    #[tokio::test]
    async fn test_read_fields_stores_image_and_keeps_text() {
        let dir = tempfile::tempdir().unwrap();
        let (fields, image) = read(
            &[
                ("title", None, "Mug"),
                ("image", Some(("mug.png", "image/png")), "PNGDATA"),
            ],
            dir.path(),
        )
        .await;

        assert_eq!(
            fields.unwrap(),
            vec![("title".to_string(), "Mug".to_string())]
        );
        let image = image.unwrap();
        assert_eq!(image.size, 7);
        assert!(image.path.starts_with(dir.path()));
        assert!(image.path.exists());
    }

    #[tokio::test]
    async fn test_read_fields_drops_disallowed_and_empty_images() {
        let dir = tempfile::tempdir().unwrap();
        let (fields, image) = read(
            &[("image", Some(("notes.txt", "text/plain")), "hello")],
            dir.path(),
        )
        .await;
        assert!(fields.unwrap().is_empty());
        assert!(image.is_none());

        let (fields, image) = read(
            &[("image", Some(("", "application/octet-stream")), "")],
            dir.path(),
        )
        .await;
        assert!(fields.unwrap().is_empty());
        assert!(image.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_read_fields_rejects_unexpected_file_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (result, image) = read(
            &[("avatar", Some(("me.png", "image/png")), "PNGDATA")],
            dir.path(),
        )
        .await;
        assert!(matches!(result, Err(UploadError::UnexpectedFile(ref f)) if f == "avatar"));
        assert!(image.is_none());
    }

    #[tokio::test]
    async fn test_read_fields_rejects_second_image_and_reports_first() {
        let dir = tempfile::tempdir().unwrap();
        let (result, image) = read(
            &[
                ("image", Some(("a.png", "image/png")), "AAA"),
                ("image", Some(("b.png", "image/png")), "BBB"),
            ],
            dir.path(),
        )
        .await;
        assert!(matches!(result, Err(UploadError::UnexpectedFile(ref f)) if f == "image"));
        // The first file is handed back so the caller can remove it.
        let image = image.unwrap();
        image.discard().await;
        assert!(!image.path.exists());
    }

    #[test]
    fn test_public_path() {
        let image = UploadedImage {
            path: PathBuf::from("/var/shop/images/abc-book.png"),
            original_name: "book.png".to_string(),
            content_type: "image/png".to_string(),
            size: 3,
        };
        assert_eq!(image.public_path(), "/images/abc-book.png");
    }

    #[tokio::test]
    async fn test_delete_image_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc-book.png");
        tokio::fs::write(&path, b"png").await.unwrap();

        delete_image(dir.path(), "/images/abc-book.png").await;
        assert!(!path.exists());

        // Missing files only log.
        delete_image(dir.path(), "/images/abc-book.png").await;
    }
}
