pub mod error;
pub mod grouping;
pub mod logger;
pub mod monitor;
pub mod validation;
