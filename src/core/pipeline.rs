use crate::core::asc_parser::AscParser;
use crate::core::csv_writer::{CsvEncoding, CsvWriter};
use crate::core::processor::DataProcessor;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::dbc::SignalCatalog;
use crate::domain::model::{ConversionReport, ExtractedLog, TransformResult};
use crate::utils::error::{ConvertError, Result};

/// ASC → CSV 轉換管道：DBC 載入與 ASC 解析、分組、寫出 CSV
pub struct ConversionPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ConversionPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ConversionPipeline<S, C> {
    async fn extract(&self) -> Result<ExtractedLog> {
        let dbc_files = self.config.dbc_files().to_vec();
        let asc_file = self.config.asc_file().to_path_buf();
        let sample_interval = self.config.sample_interval();
        let debug = self.config.debug();

        tracing::info!("Loading {} DBC file(s)", dbc_files.len());

        // Both steps are blocking file work.
        let (catalog, sampled) = tokio::task::spawn_blocking(move || {
            let catalog = SignalCatalog::load(&dbc_files)?;
            tracing::info!(
                "DBC ready: {} messages, {} signals",
                catalog.message_count(),
                catalog.signal_count()
            );

            tracing::info!("Parsing ASC file: {}", asc_file.display());
            let mut parser = AscParser::new(sample_interval, debug);
            parser.parse_file(&asc_file, &catalog)?;
            Ok::<_, ConvertError>((catalog, parser.into_sampled()))
        })
        .await
        .map_err(|e| ConvertError::processing(format!("ASC parsing task failed: {}", e)))??;

        let (original, time_points, found) = sampled.statistics();
        tracing::info!(
            "ASC parse complete: {} data points, {} time points, {} signals",
            original,
            time_points,
            found
        );
        if sampled.stats.unknown_frames > 0 || sampled.stats.decode_errors > 0 {
            tracing::debug!(
                "Skipped {} frames with unknown ids, {} undecodable frames",
                sampled.stats.unknown_frames,
                sampled.stats.decode_errors
            );
        }

        Ok(ExtractedLog { catalog, sampled })
    }

    async fn transform(&self, data: ExtractedLog) -> Result<TransformResult> {
        let ExtractedLog { catalog, sampled } = data;
        let stats = sampled.stats;

        let data = DataProcessor::process(sampled, &catalog);
        tracing::info!(
            "Grouped {} signals into {} groups",
            data.signal_count(),
            data.sorted_groups.len()
        );
        for (group, count) in data.group_statistics() {
            tracing::debug!("  {}: {} signals", group, count);
        }

        Ok(TransformResult {
            catalog,
            data,
            stats,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<ConversionReport> {
        let encoding: CsvEncoding = self.config.csv_encoding().parse()?;
        let writer = CsvWriter::new(encoding, self.config.group_size());

        let rendered = writer.render_all(&result.data, &result.catalog)?;
        tracing::debug!("Writing {} CSV files", rendered.len());

        let mut files = Vec::with_capacity(rendered.len());
        for file in rendered {
            self.storage.write_file(&file.name, &file.contents).await?;
            let path = self.storage.resolve(&file.name);
            tracing::info!("Wrote {}", path.display());
            files.push(path);
        }

        Ok(ConversionReport {
            output_dir: self.config.output_dir().to_path_buf(),
            files,
            groups: result.data.group_statistics(),
            time_points: result.data.rows.len(),
            stats: result.stats,
        })
    }
}
