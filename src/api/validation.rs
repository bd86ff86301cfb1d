use bytes::Bytes;
use thiserror::Error;

use crate::multipart::DecodedForm;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormValidationError {
    #[error("Gambar tidak ditemukan!")]
    MissingImage,
    #[error("Username tidak boleh kosong!")]
    MissingUsername,
}

/// A decoded form that carries everything the upstream call needs
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: Bytes,
    pub file_name: String,
    /// Media type sent with the forwarded image part
    pub content_type: String,
    pub username: String,
}

/// The image must be non-empty and the username present after trimming.
pub fn validate_form(form: DecodedForm) -> Result<GenerationRequest, FormValidationError> {
    if form.image_bytes.is_empty() {
        return Err(FormValidationError::MissingImage);
    }

    let username = form
        .username
        .filter(|name| !name.is_empty())
        .ok_or(FormValidationError::MissingUsername)?;

    // Prefer what the client declared; otherwise guess from the file extension.
    let content_type = form.image_content_type.unwrap_or_else(|| {
        mime_guess::from_path(&form.image_file_name)
            .first_or_octet_stream()
            .to_string()
    });

    Ok(GenerationRequest {
        image: form.image_bytes,
        file_name: form.image_file_name,
        content_type,
        username,
    })
}
