use thiserror::Error;

#[derive(Debug, Error)]
pub enum BudgetPdfError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Layout error: {0}")]
    LayoutError(String),

    #[error(
        "Budget exceeded: {budget} bytes allowed, {} after {attempts} attempts",
        describe_achieved(.achieved)
    )]
    BudgetExceeded {
        budget: usize,
        /// Size of the last measured attempt, if any attempt completed.
        achieved: Option<usize>,
        attempts: u32,
    },

    /// A batch member failed; `index` is 1-based in input order.
    #[error("input #{index}: {source}")]
    Input {
        index: usize,
        #[source]
        source: Box<BudgetPdfError>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`BudgetPdfError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl BudgetPdfError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create an invalid input error.
    invalid_input => InvalidInput,
    /// Create a decode error.
    decode => DecodeError,
    /// Create an encode error.
    encode => EncodeError,
    /// Create a layout error.
    layout => LayoutError,
}

impl BudgetPdfError {
    /// Attribute this error to the batch member at `index` (1-based).
    pub fn at_input(self, index: usize) -> Self {
        Self::Input {
            index,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`BudgetPdfError::Input`] wrappers.
    pub fn root(&self) -> &Self {
        match self {
            Self::Input { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure was caused by the caller's input rather than the server.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self.root(),
            Self::ConfigError(_) | Self::InvalidInput(_) | Self::DecodeError(_)
        )
    }
}

fn describe_achieved(achieved: &Option<usize>) -> String {
    match achieved {
        Some(n) => format!("{n} bytes"),
        None => "no size measured".to_string(),
    }
}

impl From<serde_yml::Error> for BudgetPdfError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BudgetPdfError>;
