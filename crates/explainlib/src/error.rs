use {
    crate::parser::KConfigError,
    std::{
        backtrace::Backtrace,
        error::Error,
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        io::Error as IoError,
        path::Path,
    },
};

/// An error raised while configuring, loading or rendering an explained defconfig.
#[derive(Debug)]
pub struct ExplainError {
    /// The kind of error that occurred.
    pub kind: ExplainErrorKind,

    /// Additional backtrace information.
    pub backtrace: Backtrace,
}

impl ExplainError {
    /// Create a new [ExplainError] with the given kind. The backtrace will be captured automatically.
    pub fn new(kind: ExplainErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Create a new [ExplainError] for an option name that is not in the catalog.
    pub fn unknown_option(name: impl ToString) -> Self {
        Self::new(ExplainErrorKind::UnknownOption(name.to_string()))
    }

    /// Create a new [ExplainError] for a value that cannot be coerced to an option's type.
    pub fn invalid_option_value(name: impl ToString, value: impl ToString) -> Self {
        Self::new(ExplainErrorKind::InvalidOptionValue {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Create a new [ExplainError] for a format template that cannot be expanded.
    pub fn invalid_template(name: impl ToString, reason: impl ToString) -> Self {
        Self::new(ExplainErrorKind::InvalidTemplate {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    }

    /// Create a new [ExplainError] for a file that could not be read or written.
    pub fn file(path: &Path, e: IoError) -> Self {
        Self::new(ExplainErrorKind::Io(IoError::new(e.kind(), format!("{}: {e}", path.display()))))
    }

    /// Indicates whether this is an [UnknownOption][ExplainErrorKind::UnknownOption] error.
    pub fn is_unknown_option(&self) -> bool {
        matches!(self.kind, ExplainErrorKind::UnknownOption(_))
    }

    /// Indicates whether this is an [InvalidOptionValue][ExplainErrorKind::InvalidOptionValue] error.
    pub fn is_invalid_option_value(&self) -> bool {
        matches!(self.kind, ExplainErrorKind::InvalidOptionValue { .. })
    }

    /// Indicates whether this is an [InvalidTemplate][ExplainErrorKind::InvalidTemplate] error.
    pub fn is_invalid_template(&self) -> bool {
        matches!(self.kind, ExplainErrorKind::InvalidTemplate { .. })
    }
}

impl Display for ExplainError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        Display::fmt(&self.kind, f)
    }
}

impl Error for ExplainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ExplainErrorKind::Kconfig(e) => Some(e),
            ExplainErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KConfigError> for ExplainError {
    fn from(e: KConfigError) -> Self {
        Self::new(ExplainErrorKind::Kconfig(e))
    }
}

impl From<IoError> for ExplainError {
    fn from(e: IoError) -> Self {
        Self::new(ExplainErrorKind::Io(e))
    }
}

/// The types of errors raised while explaining a defconfig.
#[derive(Debug)]
pub enum ExplainErrorKind {
    /// The option name is not in the catalog.
    UnknownOption(String),

    /// The value cannot be coerced to the option's type.
    InvalidOptionValue {
        /// The option name.
        name: String,

        /// The rejected value.
        value: String,
    },

    /// A format template references an unknown placeholder or has unbalanced braces.
    InvalidTemplate {
        /// The option holding the template.
        name: String,

        /// What is wrong with it.
        reason: String,
    },

    /// The Kconfig tree or a configuration file could not be loaded.
    Kconfig(KConfigError),

    /// I/O error.
    Io(IoError),
}

impl Display for ExplainErrorKind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::UnknownOption(name) => write!(f, "{name} is not option name"),
            Self::InvalidOptionValue {
                name,
                value,
            } => write!(f, "{value} is invalid option value for {name}"),
            Self::InvalidTemplate {
                name,
                reason,
            } => write!(f, "Invalid template in {name}: {reason}"),
            Self::Kconfig(e) => Display::fmt(e, f),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::ExplainError,
        std::{error::Error, io::ErrorKind, path::Path},
    };

    #[test]
    fn messages() {
        assert_eq!(ExplainError::unknown_option("nope").to_string(), "nope is not option name");
        assert_eq!(
            ExplainError::invalid_option_value("print_max_column", "abc").to_string(),
            "abc is invalid option value for print_max_column"
        );

        let e = ExplainError::file(Path::new("out.config"), ErrorKind::PermissionDenied.into());
        assert!(e.to_string().starts_with("I/O error: out.config: "));
        assert!(e.source().is_some());
    }
}
