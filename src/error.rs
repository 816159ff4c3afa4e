use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid filter type: {0}")]
    InvalidFilter(String),

    #[error("{reason}")]
    Unsupported {
        filter: &'static str,
        reason: String,
    },

    #[error("Invalid input image: {0}")]
    InvalidImage(String),

    #[error("Malformed parameter {name}: {reason}")]
    MalformedParameter { name: String, reason: String },

    #[error("Wrong number of arguments: {0}")]
    ArgumentCount(String),

    #[error("{filter} failed: {reason}")]
    Algorithm {
        filter: &'static str,
        reason: String,
    },

    #[error("Output {0} was not written")]
    MissingOutput(&'static str),

    #[error("Output {0} was written more than once")]
    DuplicateOutput(&'static str),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl FilterError {
    pub(crate) fn malformed(name: &str, reason: impl Into<String>) -> Self {
        FilterError::MalformedParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FilterError>;
