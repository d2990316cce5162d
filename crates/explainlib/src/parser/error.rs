use {
    crate::parser::Location,
    std::{
        backtrace::Backtrace,
        error::Error,
        fmt::{Debug, Display, Formatter, Result as FmtResult},
        io::Error as IoError,
        path::{Path, PathBuf},
    },
};

/// An error that occurred while loading a Kconfig tree or a configuration file.
#[derive(Debug)]
pub struct KConfigError {
    /// The kind of error that occurred.
    pub kind: KConfigErrorKind,

    /// Additional backtrace information.
    pub backtrace: Backtrace,

    /// The location of the error.
    pub location: Option<Location>,
}

impl KConfigError {
    /// Create a new [KConfigError] with the given kind. The backtrace will be captured automatically.
    pub fn new(kind: KConfigErrorKind, location: Location) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
            location: Some(location),
        }
    }

    /// Create a new [KConfigError] for an invalid environment variable.
    pub fn invalid_env(var: impl ToString, location: Location) -> Self {
        Self::new(KConfigErrorKind::InvalidEnv(var.to_string()), location)
    }

    /// Create a new [KConfigError] for a missing token.
    pub fn missing(expected: impl Into<Expected>, location: Location) -> Self {
        Self::new(KConfigErrorKind::Missing(expected.into()), location)
    }

    /// Create a new [KConfigError] for a file that could not be opened or read.
    pub fn open(path: &Path, e: IoError) -> Self {
        Self {
            kind: KConfigErrorKind::Open(path.to_path_buf(), e),
            backtrace: Backtrace::capture(),
            location: None,
        }
    }

    /// Create a new [KConfigError] for `source` statements nested too deeply.
    pub fn recursive_source(path: &Path, location: Location) -> Self {
        Self::new(KConfigErrorKind::RecursiveSource(path.to_path_buf()), location)
    }

    /// Create a new [KConfigError] for a syntax error.
    pub fn syntax(e: impl ToString, location: Location) -> Self {
        Self::new(KConfigErrorKind::Syntax(e.to_string()), location)
    }

    /// Create a new [KConfigError] for an unexpected character or string.
    pub fn unexpected(s: impl ToString, expected: impl Into<Expected>, location: Location) -> Self {
        Self::new(KConfigErrorKind::Unexpected(s.to_string(), expected.into()), location)
    }

    /// Create a new [KConfigError] for an unexpected end-of-file.
    pub fn unexpected_eof(expected: impl Into<Expected>, location: Location) -> Self {
        Self::new(KConfigErrorKind::UnexpectedEof(expected.into()), location)
    }

    /// Create a new [KConfigError] for an unknown environment variable.
    pub fn unknown_env(var: impl ToString, location: Location) -> Self {
        Self::new(KConfigErrorKind::UnknownEnv(var.to_string()), location)
    }
}

impl Display for KConfigError {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if let Some(loc) = &self.location {
            write!(f, "{}: {}", loc, self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl From<IoError> for KConfigError {
    fn from(e: IoError) -> Self {
        Self {
            kind: KConfigErrorKind::Io(e),
            backtrace: Backtrace::capture(),
            location: None,
        }
    }
}

impl Error for KConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            KConfigErrorKind::Io(e) | KConfigErrorKind::Open(_, e) => Some(e),
            _ => None,
        }
    }
}

/// The types of errors that can occur while loading a Kconfig tree.
#[derive(Debug)]
pub enum KConfigErrorKind {
    /// Invalid environment variable.
    InvalidEnv(String),

    /// I/O error.
    Io(IoError),

    /// Missing a required token.
    Missing(Expected),

    /// A file could not be opened or read.
    Open(PathBuf, IoError),

    /// `source` statements nested too deeply (most likely a file sourcing itself).
    RecursiveSource(PathBuf),

    /// Syntax error.
    Syntax(String),

    /// Expected a certain token, but got a different string.
    Unexpected(String, Expected),

    /// Expected a token of a certain type, but got end-of-file.
    UnexpectedEof(Expected),

    /// Unknown variable in filename expansion.
    UnknownEnv(String),
}

impl Display for KConfigErrorKind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::InvalidEnv(var) => write!(f, "Non-Unicode environment variable: {var}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Missing(expected) => write!(f, "Missing {expected}"),
            Self::Open(path, e) => write!(f, "{}: {e}", path.display()),
            Self::RecursiveSource(path) => write!(f, "Recursive source of {}", path.display()),
            Self::Syntax(e) => write!(f, "Syntax error: {e}"),
            Self::Unexpected(s, expected) => {
                write!(f, "{s:?} unexpected; expected {expected}")
            }
            Self::UnexpectedEof(expected) => {
                if *expected == Expected::Any {
                    write!(f, "Unexpected end-of-file")
                } else {
                    write!(f, "Unexpected end-of-file, expected {expected}")
                }
            }
            Self::UnknownEnv(var) => write!(f, "Unknown variable: {var}"),
        }
    }
}

/// Expected input description.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expected {
    /// Any character.
    Any,

    /// `endchoice` keyword.
    EndChoice,

    /// `endif` keyword.
    EndIf,

    /// `endmenu` keyword.
    EndMenu,

    /// End-of-line.
    Eol,

    /// Expression.
    Expr,

    /// `if` keyword.
    If,

    /// `if` or end-of-line.
    IfOrEol,

    /// `on` keyword.
    On,

    /// The given character, such as a closing quote.
    Char(char),

    /// Right parenthesis.
    RParen,

    /// A Kconfig statement (`config`, `menu`, `source`, ...).
    Statement,

    /// A string literal.
    StringLiteral,

    /// A symbol.
    Symbol,
}

impl Display for Expected {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Any => f.write_str("any character"),
            Self::Eol => f.write_str("end of line"),
            Self::EndChoice => f.write_str("endchoice"),
            Self::EndIf => f.write_str("endif"),
            Self::EndMenu => f.write_str("endmenu"),
            Self::Expr => f.write_str("expression"),
            Self::If => f.write_str("if"),
            Self::IfOrEol => f.write_str("if or end of line"),
            Self::On => f.write_str("on"),
            Self::Char(c) => write!(f, "'{c}'"),
            Self::RParen => f.write_str("right parenthesis"),
            Self::Statement => f.write_str("statement"),
            Self::StringLiteral => f.write_str("string literal"),
            Self::Symbol => f.write_str("symbol"),
        }
    }
}

impl From<char> for Expected {
    fn from(c: char) -> Self {
        Self::Char(c)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{Expected, KConfigError},
        crate::parser::Location,
        std::path::Path,
    };

    #[test]
    fn messages() {
        let loc = Location::start_of(Path::new("Kconfig"));
        assert_eq!(KConfigError::unexpected_eof(Expected::Any, loc).kind.to_string(), "Unexpected end-of-file");
        assert_eq!(
            KConfigError::unexpected_eof('"', loc).kind.to_string(),
            "Unexpected end-of-file, expected '\"'"
        );
        assert_eq!(KConfigError::unexpected('x', '\'', loc).kind.to_string(), "\"x\" unexpected; expected '''");
    }
}
