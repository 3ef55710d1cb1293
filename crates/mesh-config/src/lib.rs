//! # Mesh Config
//!
//! Configuration management for the agent mesh.
//!
//! Configuration is layered: built-in defaults, then an optional YAML or
//! TOML file, then `MESH_*` environment overrides. The result is validated
//! before any component is constructed; configuration errors are the only
//! errors allowed to abort startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    DirectoryConfig, HeartbeatConfig, MeshConfig, OrchestratorConfig, ProviderConfig,
    ProviderKind, RoutingConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{apply_env_overrides, load_config, ENV_PREFIX};
