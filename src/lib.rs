pub mod config;
pub mod core;
pub mod dbc;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, Cli};

pub use config::{ConfigOverrides, ConvertConfig};
pub use core::{etl::EtlEngine, pipeline::ConversionPipeline};
pub use domain::model::ConversionReport;
pub use utils::error::{ConvertError, Result};
