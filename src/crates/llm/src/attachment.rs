//! File attachments for user turns.
//!
//! Files are read, size-checked and base64-encoded here, before anything
//! reaches the history store. The format is inferred from the extension.

use crate::error::{LlmError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use history::{ContentPart, DocumentFormat, ImageFormat};
use std::path::Path;
use tracing::debug;

/// Largest file accepted as an attachment (4.5 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 4_718_592;

/// Most documents accepted in one request.
pub const MAX_DOCUMENTS: usize = 5;

async fn read_attachment(path: &Path) -> Result<Vec<u8>> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Err(LlmError::AttachmentNotFound(path.display().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LlmError::AttachmentNotFound(path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    if metadata.len() > MAX_ATTACHMENT_BYTES {
        return Err(LlmError::AttachmentTooLarge {
            path: path.display().to_string(),
            size: metadata.len(),
            max: MAX_ATTACHMENT_BYTES,
        });
    }

    Ok(tokio::fs::read(path).await?)
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

/// Read an image file into an image part.
pub async fn encode_image(path: impl AsRef<Path>) -> Result<ContentPart> {
    let path = path.as_ref();
    let bytes = read_attachment(path).await?;
    let format = ImageFormat::from_extension(extension(path));

    debug!(path = %path.display(), format = format.as_str(), bytes = bytes.len(), "Encoded image");
    Ok(ContentPart::image(format, STANDARD.encode(bytes)))
}

/// Read a document file into a document part named after the file.
pub async fn encode_document(path: impl AsRef<Path>) -> Result<ContentPart> {
    let path = path.as_ref();
    let bytes = read_attachment(path).await?;
    let format = DocumentFormat::from_extension(extension(path));
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    debug!(path = %path.display(), format = format.as_str(), bytes = bytes.len(), "Encoded document");
    Ok(ContentPart::document(format, STANDARD.encode(bytes), name))
}

/// Build the parts of a user turn: text first, then images, then documents.
///
/// The document count is checked before any file is read.
pub async fn build_user_parts<P: AsRef<Path>>(
    text: &str,
    image_paths: &[P],
    document_paths: &[P],
) -> Result<Vec<ContentPart>> {
    if document_paths.len() > MAX_DOCUMENTS {
        return Err(LlmError::TooManyAttachments {
            count: document_paths.len(),
            max: MAX_DOCUMENTS,
        });
    }

    let mut parts = Vec::with_capacity(1 + image_paths.len() + document_paths.len());
    if !text.is_empty() {
        parts.push(ContentPart::text(text));
    }
    for path in image_paths {
        parts.push(encode_image(path).await?);
    }
    for path in document_paths {
        parts.push(encode_document(path).await?);
    }
    Ok(parts)
}
