use std::fmt;

/// Errors raised at the edges of the engine (config and candidate loading).
///
/// Identity resolution itself never fails: unusable addresses degrade to
/// sentinel keys instead of producing an error.
#[derive(Debug)]
pub enum DedupeError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate source, bad threshold, etc.).
    ConfigValidation(String),
    /// A candidate record could not be parsed. `line` is 1-based.
    InputParse { line: usize, message: String },
    /// Source name that is not one of the known listing sources.
    UnknownSource(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for DedupeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InputParse { line, message } => {
                write!(f, "input line {line}: {message}")
            }
            Self::UnknownSource(name) => write!(f, "unknown source: {name}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for DedupeError {}

impl From<std::io::Error> for DedupeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
