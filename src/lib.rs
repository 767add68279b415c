pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod extract;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::HttpFetcher;
pub use app::pipelines::IndicatorPipeline;
pub use config::cli::LocalStorage;
pub use config::toml_config::TomlConfig;
pub use core::etl::EtlEngine;
pub use domain::model::{IndicatorBundle, Month, MonthMap};
pub use utils::error::{EtlError, Result};
