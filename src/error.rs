use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("Trace error: {0}")]
    TraceError(#[from] TraceError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Fatal errors raised while initializing the cache geometry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("input parameters must be positive numbers")]
    NonPositive,

    #[error("cache must be no larger than {max} blocks (requested {lines})")]
    TooManyLines { lines: usize, max: usize },

    #[error("blocks must be no larger than {max} words (requested {words})")]
    BlockTooLarge { words: usize, max: usize },
}

/// Errors related to trace and memory image files
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse '{0}' at line {1}: {2}")]
    ParseError(PathBuf, usize, String),

    #[error("Memory image '{0}' does not fit in {1} words")]
    ImageTooLarge(PathBuf, usize),
}

/// Errors related to cache and memory operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Memory address out of bounds: {0:#06x}")]
    AddressOutOfBounds(u32),

    #[error("Line {line} does not belong to the set starting at {set_start}")]
    LineOutOfSet { line: usize, set_start: usize },

    #[error("Line {0} is not the first line of a set")]
    InvalidSetStart(usize),

    #[error("No LRU victim found in set {0}")]
    NoVictim(usize),

    #[error("Cache inconsistency detected in set {0}: {1}")]
    CacheInconsistency(usize, String),
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
