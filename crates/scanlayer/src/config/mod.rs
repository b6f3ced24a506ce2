pub mod loader;
pub mod profile;
pub mod schema;

pub use loader::{default_config_path, load_config, load_config_from_str};
pub use profile::{Device, EngineProfile};
pub use schema::{AssemblyConfig, Config, OcrConfig, ProgressConfig, WorkersConfig};
