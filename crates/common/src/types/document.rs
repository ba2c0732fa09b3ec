use std::fmt;

use crate::error::PoliSenseError;
use crate::ids::SessionId;

/// A submitted article: raw bytes plus the name and MIME type they arrived with.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    /// Build a document, inferring the MIME type from the file extension.
    ///
    /// Only PDF and plain text are accepted: the document is attached as-is to
    /// every generative request, and neither provider reads Word files.
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Result<Self, PoliSenseError> {
        let mime_type = mime_for_file_name(file_name)
            .ok_or_else(|| PoliSenseError::UnsupportedDocument(file_name.to_string()))?;

        Ok(Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// Session id for conversations about this document.
    pub fn session_id(&self) -> SessionId {
        SessionId::for_document(&self.bytes)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub fn mime_for_file_name(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}
