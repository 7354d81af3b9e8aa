use vox_protocol::drive::GraphErrorBody;

/// Errors from the document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("no document library on site {0}")]
    NoDrive(String),

    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Classifies an unsuccessful response from its status and body.
    ///
    /// 404 is [`NotFound`](Self::NotFound); 409 and the `nameAlreadyExists`
    /// code are [`Conflict`](Self::Conflict); everything else keeps the
    /// status and the store-provided detail.
    pub fn from_response(status: u16, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<GraphErrorBody>(body) {
            Ok(parsed) => (parsed.error.code, parsed.error.message),
            Err(_) => (String::new(), body.trim().to_string()),
        };

        if status == 404 {
            return Self::NotFound(message);
        }
        if status == 409 || code == "nameAlreadyExists" {
            return Self::Conflict(message);
        }
        Self::Status {
            status,
            code,
            message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// HTTP status carried by the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(404),
            Self::Conflict(_) => Some(409),
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
