//! Error taxonomy for loading, retrieval, and generation.
//!
//! Library functions return [`Result<T>`]; the `memo` binary wraps these in
//! `anyhow` for context. Nothing in the pipeline recovers internally: an error
//! from the index or the completion service surfaces to the caller as-is.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The source path does not end in `.pdf` or `.txt`.
    #[error("unsupported file type '{0}': only PDF and TXT are supported")]
    UnsupportedFormat(String),

    /// A text file contained invalid UTF-8.
    #[error("text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// The PDF could not be parsed at all.
    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    /// The retrieval index (or the embedder behind it) was unreachable,
    /// rejected a request, or returned something unparseable.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The completion service failed or returned a malformed response.
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::Encoding(_) => "encoding_error",
            Error::Extraction(_) => "extraction_failure",
            Error::Retrieval(_) => "retrieval_failure",
            Error::Generation(_) => "generation_failure",
            Error::Io(_) => "io_error",
            Error::Config(_) => "config_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_utf8_converts_to_encoding_error() {
        let err: Error = String::from_utf8(vec![0xff, 0xfe]).unwrap_err().into();
        assert!(matches!(err, Error::Encoding(_)));
        assert_eq!(err.code(), "encoding_error");
    }

    #[test]
    fn unsupported_format_message_names_extension() {
        let err = Error::UnsupportedFormat("docx".to_string());
        assert!(err.to_string().contains("docx"));
    }
}
