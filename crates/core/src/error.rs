/// Domain error taxonomy.
///
/// Every failure a request can hit is expressed as one of these variants.
/// The HTTP layer maps each variant to a status code and a stable error code,
/// so callers never have to inspect message text to learn what went wrong.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// Request-shape validation. `fields` lists every offending field.
    #[error("Validation failed: {message} ({})", fields.join(", "))]
    Validation {
        fields: Vec<String>,
        message: String,
    },

    /// Malformed or incomplete request (missing required fields, bad JSON).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        fields: Vec<String>,
        message: String,
    },

    /// The explicit publish action requires a thumbnail asset.
    #[error("Template '{slug}' has no thumbnail asset")]
    ThumbnailRequired { slug: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// An external collaborator (e.g. the generative-AI API) failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a validation failure over a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            fields: vec![field.to_string()],
            message: message.into(),
        }
    }
}
