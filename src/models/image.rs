use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{Result, StudioError};

pub const ALLOWED_FILE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];
pub const MAX_FILE_SIZE_MB: usize = 10;
pub const MAX_FILE_SIZE_BYTES: usize = MAX_FILE_SIZE_MB * 1024 * 1024;

/// Reference image uploaded by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_FILE_TYPES.contains(&self.content_type.as_str()) {
            return Err(StudioError::InvalidRequest(
                "Invalid file type. Please use JPG or PNG.".into(),
            ));
        }
        if self.bytes.len() > MAX_FILE_SIZE_BYTES {
            return Err(StudioError::InvalidRequest(format!(
                "File is too large. Max size is {}MB.",
                MAX_FILE_SIZE_MB
            )));
        }
        if self.bytes.is_empty() {
            return Err(StudioError::InvalidRequest("Image file is empty.".into()));
        }
        Ok(())
    }

    /// `data:` URL used for previews.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}
