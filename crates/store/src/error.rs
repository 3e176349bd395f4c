use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// The backing store could not be opened or read.
    Backend(String),
    /// The atomic commit failed; nothing from the plan was applied. The
    /// caller retries the whole batch or abandons the unit.
    Commit(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(msg) => write!(f, "store backend error: {msg}"),
            Self::Commit(msg) => write!(f, "store commit error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}
