use thiserror::Error;

pub type Result<T> = std::result::Result<T, CertError>;

#[derive(Debug, Error)]
pub enum CertError {
    /// Nothing usable to generate from, or a required course field is blank.
    #[error("{0}")]
    Validation(String),

    #[error("could not parse date {input:?}: {reason}")]
    Parse { input: String, reason: String },

    #[error("render failed: {0}")]
    Render(String),

    #[error("invalid PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("could not read spreadsheet: {0}")]
    Workbook(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl CertError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the failure should be shown inline before generation rather
    /// than as a generation error banner.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<calamine::Error> for CertError {
    fn from(e: calamine::Error) -> Self {
        Self::Workbook(e.to_string())
    }
}

impl From<csv::Error> for CertError {
    fn from(e: csv::Error) -> Self {
        Self::Workbook(e.to_string())
    }
}
