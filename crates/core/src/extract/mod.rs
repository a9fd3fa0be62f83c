mod pdf;

#[cfg(test)]
pub(crate) use pdf::fixtures as pdf_fixtures;

use bytes::Bytes;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub const MIME_PLAIN_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unsupported file type. Please upload a .txt or .pdf file.")]
    UnsupportedFileType { media_type: String },

    #[error("Failed to read the PDF file. It might be corrupted or protected.")]
    DocumentRead(String),
}

impl ExtractError {
    /// Underlying cause, for logs. The Display text is what the user sees.
    pub fn detail(&self) -> &str {
        match self {
            ExtractError::UnsupportedFileType { media_type } => media_type,
            ExtractError::DocumentRead(detail) => detail,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    PlainText,
    Pdf,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::PlainText => MIME_PLAIN_TEXT,
            MediaType::Pdf => MIME_PDF,
        }
    }
}

impl FromStr for MediaType {
    type Err = ExtractError;

    fn from_str(declared: &str) -> Result<Self, Self::Err> {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            MIME_PLAIN_TEXT => Ok(MediaType::PlainText),
            MIME_PDF => Ok(MediaType::Pdf),
            _ => Err(ExtractError::UnsupportedFileType {
                media_type: declared.to_owned(),
            }),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded file: raw bytes plus the media type it was declared with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    pub name: Option<String>,
    pub declared_type: String,
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new<T: Into<String>>(declared_type: T, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: None,
            declared_type: declared_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Reads `path` from disk. An unsupported declared type is rejected before the
    /// file is opened.
    pub async fn from_path(
        path: impl AsRef<Path>,
        declared_type: impl Into<String>,
    ) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let declared_type = declared_type.into();
        declared_type.parse::<MediaType>()?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "file read failed");
            ExtractError::DocumentRead(format!("{}: {e}", path.display()))
        })?;
        Ok(Self::new(declared_type, bytes).with_name(path.display().to_string()))
    }
}

/// Immutable transcript text. Replaced wholesale, never edited in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document(Arc<str>);

impl Document {
    pub fn new<S: Into<Arc<str>>>(text: S) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Turns an uploaded file into a [`Document`].
///
/// The declared media type is checked before any bytes are looked at. PDFs are
/// read one page at a time in page order; a failure anywhere yields no text at all.
pub async fn extract(file: &SourceFile) -> Result<Document, ExtractError> {
    let media_type: MediaType = file.declared_type.parse()?;
    tracing::debug!(
        media_type = %media_type,
        name = file.name.as_deref().unwrap_or("<unnamed>"),
        bytes = file.bytes.len(),
        "extracting document"
    );

    let text = match media_type {
        MediaType::PlainText => decode_plain_text(&file.bytes),
        MediaType::Pdf => pdf::extract_text(&file.bytes).await?,
    };

    Ok(Document::from(text))
}

/// UTF-8 unless a byte order mark says otherwise; the mark itself is dropped.
/// Malformed sequences become U+FFFD.
fn decode_plain_text(bytes: &[u8]) -> String {
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if encoding != encoding_rs::UTF_8 || had_errors {
        tracing::debug!(encoding = encoding.name(), had_errors, "plain text decoded");
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_is_returned_verbatim() {
        let raw = "  Alice smiled.\r\nBob frowned.\n\n\tThe end?  ";
        let doc = extract(&SourceFile::new("text/plain", raw.as_bytes().to_vec()))
            .await
            .expect("plain text extracts");
        assert_eq!(doc.as_str(), raw);
    }

    #[tokio::test]
    async fn plain_text_with_charset_parameter_is_accepted() {
        let doc = extract(&SourceFile::new("text/plain; charset=UTF-8", "héllo"))
            .await
            .expect("plain text extracts");
        assert_eq!(doc.as_str(), "héllo");
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected_before_decoding() {
        let err = extract(&SourceFile::new("image/png", vec![0x89, b'P', b'N', b'G']))
            .await
            .expect_err("png is not supported");
        assert_eq!(
            err,
            ExtractError::UnsupportedFileType {
                media_type: "image/png".to_owned()
            }
        );
        assert_eq!(
            err.to_string(),
            "Unsupported file type. Please upload a .txt or .pdf file."
        );
    }

    #[tokio::test]
    async fn garbage_pdf_is_a_read_error() {
        let err = extract(&SourceFile::new("application/pdf", "definitely not a pdf"))
            .await
            .expect_err("garbage does not parse");
        assert!(matches!(err, ExtractError::DocumentRead(_)));
    }

    #[tokio::test]
    async fn missing_file_is_a_read_error() {
        let err = SourceFile::from_path("/nonexistent/emotion-lens/input.txt", "text/plain")
            .await
            .expect_err("file does not exist");
        assert!(matches!(err, ExtractError::DocumentRead(_)));
    }

    #[tokio::test]
    async fn unsupported_path_is_rejected_before_reading() {
        let err = SourceFile::from_path("/nonexistent/emotion-lens/photo.png", "image/png")
            .await
            .expect_err("png is not supported");
        assert_eq!(
            err,
            ExtractError::UnsupportedFileType {
                media_type: "image/png".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn utf8_bom_is_stripped() {
        let mut raw = vec![0xEF, 0xBB, 0xBF];
        raw.extend_from_slice(b"Alice smiled.");
        let doc = extract(&SourceFile::new("text/plain", raw))
            .await
            .expect("plain text extracts");
        assert_eq!(doc.as_str(), "Alice smiled.");
    }

    #[tokio::test]
    async fn utf16_files_are_decoded_by_bom() {
        let mut le = vec![0xFF, 0xFE];
        le.extend("Alice smiled’.".encode_utf16().flat_map(u16::to_le_bytes));
        let doc = extract(&SourceFile::new("text/plain", le))
            .await
            .expect("utf-16le extracts");
        assert_eq!(doc.as_str(), "Alice smiled’.");

        let mut be = vec![0xFE, 0xFF];
        be.extend("Bob frowned.".encode_utf16().flat_map(u16::to_be_bytes));
        let doc = extract(&SourceFile::new("text/plain", be))
            .await
            .expect("utf-16be extracts");
        assert_eq!(doc.as_str(), "Bob frowned.");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_rejected() {
        let doc = extract(&SourceFile::new("text/plain", vec![b'c', 0xE9, b'!']))
            .await
            .expect("lossy decode");
        assert_eq!(doc.as_str(), "c\u{FFFD}!");
    }

    #[tokio::test]
    async fn from_path_reads_bytes_and_name() {
        let path = std::env::temp_dir().join(format!(
            "emotion-lens-extract-{}.txt",
            std::process::id()
        ));
        tokio::fs::write(&path, "Bob laughed.").await.expect("write temp file");

        let file = SourceFile::from_path(&path, "text/plain")
            .await
            .expect("file readable");
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(file.name.as_deref(), Some(path.display().to_string().as_str()));
        let doc = extract(&file).await.expect("extracts");
        assert_eq!(doc.as_str(), "Bob laughed.");
    }

    #[test]
    fn blank_documents_are_detected() {
        assert!(Document::default().is_blank());
        assert!(Document::from(" \n\t ").is_blank());
        assert!(!Document::from(" x ").is_blank());
    }

    #[test]
    fn media_type_parsing_is_case_insensitive() {
        assert_eq!("Application/PDF".parse::<MediaType>(), Ok(MediaType::Pdf));
        assert!("text/html".parse::<MediaType>().is_err());
        assert!("".parse::<MediaType>().is_err());
    }
}
