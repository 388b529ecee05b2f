use thiserror::Error;

/// Result type alias using [`PowerFlowError`].
pub type Result<T> = std::result::Result<T, PowerFlowError>;

#[derive(Error, Debug)]
pub enum PowerFlowError {
    /// Text that is neither rectangular (`a+bj`) nor polar (`mag<deg`).
    #[error("invalid value '{input}': {reason} (use rectangular form, e.g. 3+4j, or polar form, e.g. 5<53.13)")]
    Format { input: String, reason: String },

    /// Division by a zero (or non-finite) impedance or voltage.
    #[error("division by zero {what}")]
    Division { what: String },

    /// Jacobian scalar or determinant within tolerance of zero.
    #[error("singular Jacobian (value: {value:.3e})")]
    SingularJacobian { value: f64 },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("invalid initial state: {0}")]
    InvalidState(String),

    #[error("failed to write history file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl PowerFlowError {
    pub fn format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn division(what: impl Into<String>) -> Self {
        Self::Division { what: what.into() }
    }
}
