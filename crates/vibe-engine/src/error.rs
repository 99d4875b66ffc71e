use vibe_contracts::api::ErrorInfo;

/// Failure of a request/response call against the vibe backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The envelope came back with `success: false`.
    #[error("{code}: {message}")]
    Envelope {
        code: String,
        message: String,
        details: Option<String>,
    },
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response envelope carried no data")]
    MissingData,
}

impl ApiError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Envelope { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<ErrorInfo> for ApiError {
    fn from(info: ErrorInfo) -> Self {
        ApiError::Envelope {
            code: info.code,
            message: info.message,
            details: info.details,
        }
    }
}
