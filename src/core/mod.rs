pub mod asc_parser;
pub mod bootstrap;
pub mod csv_cleaner;
pub mod csv_loader;
pub mod csv_writer;
pub mod etl;
pub mod pipeline;
pub mod processor;

pub use crate::domain::model::{ConversionReport, ExtractedLog, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
