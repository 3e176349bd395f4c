use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// The key column is missing from one of the tables. Fatal to the
    /// current batch; the caller skips the unit and moves on.
    MissingKeyColumn { side: &'static str, column: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKeyColumn { side, column } => {
                write!(f, "schema error: {side} table has no key column '{column}'")
            }
        }
    }
}

impl std::error::Error for ReconError {}
