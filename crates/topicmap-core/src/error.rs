use thiserror::Error;

/// Error taxonomy for the analysis core.
///
/// `IncompleteData` is page-scoped and recoverable: the offending page is
/// excluded from the computation that needed the data, the run continues.
/// `StructuralInvariant` and `Configuration` are fatal; a run either yields
/// the full artifact set or one of these and nothing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Incomplete data: {0}")]
    IncompleteData(String),

    #[error("Structural invariant violated: {0}")]
    StructuralInvariant(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
