//! Configuration management
//!
//! Where the chain lives on disk, the difficulty new chains are sealed at
//! and an optional mining timeout. Read from an optional TOML file and
//! `LEDGER_*` environment variables.

pub mod settings;

pub use settings::Config;
