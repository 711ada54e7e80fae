//! Error type shared by every stage of the pipeline.
//!
//! Most of these errors never leave the stage that produced them: fetch,
//! extraction and generation failures are logged and replaced by a fallback
//! at the smallest scope (the link, the article, the call). Only the
//! orchestrator and the output writer hand an [`Error`] back to `main`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Inconsistent record set: {0}")]
    Inconsistent(String),

    #[error("Run aborted: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_names_url() {
        let e = Error::Status {
            url: "https://example.com/news".to_string(),
            status: 503,
        };
        assert_eq!(e.to_string(), "https://example.com/news answered with HTTP 503");
    }

    #[test]
    fn test_io_conversion() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(Error::Io(_))));
    }
}
