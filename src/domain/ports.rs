use crate::domain::model::{ConversionReport, ExtractedLog, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Names of files directly under the storage root with the given extension, sorted.
    fn list_files(
        &self,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    /// Where a relative name ends up, for reporting.
    fn resolve(&self, path: &str) -> PathBuf;
}

pub trait ConfigProvider: Send + Sync {
    fn asc_file(&self) -> &Path;
    fn dbc_files(&self) -> &[PathBuf];
    fn output_dir(&self) -> &Path;
    fn sample_interval(&self) -> f64;
    fn group_size(&self) -> usize;
    fn csv_encoding(&self) -> &str;
    fn debug(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractedLog>;
    async fn transform(&self, data: ExtractedLog) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<ConversionReport>;
}
