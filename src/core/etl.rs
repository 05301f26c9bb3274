use crate::core::Pipeline;
use crate::domain::model::ConversionReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<ConversionReport> {
        tracing::info!("Starting conversion...");
        self.monitor.log_stats("start");

        // Extract
        tracing::info!("[1/3] Loading DBC files and parsing ASC log...");
        let extracted = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} data points from {} lines",
            extracted.sampled.stats.original_count,
            extracted.sampled.stats.lines_read
        );
        self.monitor.log_stats("extract");

        // Transform
        tracing::info!("[2/3] Grouping signals...");
        let transformed = self.pipeline.transform(extracted).await?;
        tracing::info!(
            "Prepared {} time points across {} groups",
            transformed.data.rows.len(),
            transformed.data.sorted_groups.len()
        );
        self.monitor.log_stats("transform");

        // Load
        tracing::info!("[3/3] Writing CSV files...");
        let report = self.pipeline.load(transformed).await?;
        tracing::info!(
            "Saved {} files to: {}",
            report.files.len(),
            report.output_dir.display()
        );
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(report)
    }
}
