use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanlayerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse engine profile: {0}")]
    ParseProfile(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Missing config section '{0}'")]
    MissingSection(&'static str),
}

/// Fatal for the run: the source tree cannot be enumerated.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Source root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("Source root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker {worker_id} failed to initialize: {reason}")]
    Init { worker_id: usize, reason: String },

    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker pool lost {outstanding} unit(s): result channel closed")]
    WorkerLost { outstanding: usize },
}

/// Classification of a per-unit or per-page failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Engine,
    DataIntegrity,
    Resolution,
    Persistence,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::Engine => write!(f, "EngineError"),
            ErrorKind::DataIntegrity => write!(f, "DataIntegrityError"),
            ErrorKind::Resolution => write!(f, "ResolutionError"),
            ErrorKind::Persistence => write!(f, "PersistenceError"),
        }
    }
}

/// Recoverable failure of one unit or one page. Never aborts the run.
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("Image validation failed for '{path}': {reason}")]
    Validation { path: PathBuf, reason: String },

    #[error("Engine failed: {0}")]
    Engine(String),

    #[error("Result data invalid for '{path}': {reason}")]
    DataIntegrity { path: PathBuf, reason: String },

    #[error("No OCR result matches page '{0}'")]
    Resolution(String),

    #[error("Failed to persist '{path}': {reason}")]
    Persistence { path: PathBuf, reason: String },
}

impl UnitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnitError::Validation { .. } => ErrorKind::Validation,
            UnitError::Engine(_) => ErrorKind::Engine,
            UnitError::DataIntegrity { .. } => ErrorKind::DataIntegrity,
            UnitError::Resolution(_) => ErrorKind::Resolution,
            UnitError::Persistence { .. } => ErrorKind::Persistence,
        }
    }
}

/// Failure reported by an OCR engine for one image.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct EngineError(pub String);

impl From<EngineError> for UnitError {
    fn from(e: EngineError) -> Self {
        UnitError::Engine(e.0)
    }
}

impl From<StorageError> for UnitError {
    fn from(e: StorageError) -> Self {
        UnitError::Persistence {
            path: e.path().to_path_buf(),
            reason: e.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy file from '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            StorageError::CreateDirectory { path, .. } | StorageError::WriteFile { path, .. } => {
                path
            }
            StorageError::CopyFile { to, .. } | StorageError::MoveFile { to, .. } => to,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanlayerError>;
