use std::fmt;

#[derive(Debug)]
pub enum ExtractError {
    /// File read error.
    Io(String),
    /// File content could not be decoded or parsed.
    Parse(String),
    /// A configured column is missing from the input.
    MissingColumn { column: String },
    /// A date column value did not match the configured input format.
    DateParse { column: String, value: String },
    /// Remote request failed.
    Http(String),
    /// Downloaded archive could not be opened or extracted.
    Archive(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::MissingColumn { column } => write!(f, "missing column '{column}'"),
            Self::DateParse { column, value } => {
                write!(f, "column '{column}': cannot parse date '{value}'")
            }
            Self::Http(msg) => write!(f, "HTTP error: {msg}"),
            Self::Archive(msg) => write!(f, "archive error: {msg}"),
        }
    }
}

impl std::error::Error for ExtractError {}
