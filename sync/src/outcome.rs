use crate::Error;

/// Why an operation returned without doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// The same scope already has a request in flight.
    Busy,
    /// The scope reported no further page.
    Exhausted,
    /// A windowed scope is already on page 1.
    AtFirstPage,
    /// Neither text nor image was provided.
    EmptySubmission,
    /// No edit or delete is staged.
    NothingStaged,
    /// The comment is not in the loaded tree.
    UnknownComment,
    /// The entity already carries the user's reaction.
    AlreadyReacted,
    /// The reaction engine has no settled state yet.
    NotReady,
    /// The response arrived for state that no longer exists.
    Stale,
}

/// Result of every public store and engine operation.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped(Skip),
    Failed(Error),
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done)
    }

    pub fn skipped(&self) -> Option<Skip> {
        match self {
            Outcome::Skipped(skip) => Some(*skip),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

impl From<Skip> for Outcome {
    fn from(skip: Skip) -> Self {
        Outcome::Skipped(skip)
    }
}

impl From<Error> for Outcome {
    fn from(error: Error) -> Self {
        Outcome::Failed(error)
    }
}
