pub mod assembly;
pub mod config;
pub mod discovery;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod sanitize;
pub mod storage;
pub mod worker;

pub use assembly::{AssemblyContextFactory, AssemblyOptions, PageOutcome};
pub use config::{default_config_path, load_config, Config, EngineProfile};
pub use error::{
    ConfigError, DiscoveryError, ErrorKind, Result, ScanlayerError, StorageError, UnitError,
    WorkerError,
};
pub use ocr::{EngineFactory, OcrEngine, PageResult};
pub use pipeline::{
    run_assembly, run_ocr, AssemblyPipelineConfig, ErrorRecord, OcrPipelineConfig, RunSummary,
};
pub use worker::WorkerPool;
