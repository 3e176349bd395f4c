use std::fmt;

#[derive(Debug)]
pub enum GeoError {
    /// Polygon lookup resolved to zero or multiple candidates, or the
    /// polygon source itself is unusable. Fatal for the spatial source.
    Configuration(String),
    /// Polygon file could not be parsed.
    Parse(String),
    /// Polygon file could not be read.
    Io(String),
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "polygon configuration error: {msg}"),
            Self::Parse(msg) => write!(f, "polygon parse error: {msg}"),
            Self::Io(msg) => write!(f, "polygon IO error: {msg}"),
        }
    }
}

impl std::error::Error for GeoError {}
