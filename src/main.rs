use asc_to_csv::config::{Command, ConvertArgs};
use asc_to_csv::core::bootstrap::{self, ConfigSeed, DataDir};
use asc_to_csv::core::csv_cleaner::{print_clean_report, CsvCleaner};
use asc_to_csv::core::csv_loader::CsvDataLoader;
use asc_to_csv::utils::error::ConvertError;
use asc_to_csv::utils::{logger, validation::Validate};
use asc_to_csv::{
    Cli, ConversionPipeline, ConversionReport, ConvertConfig, EtlEngine, LocalStorage,
};
use clap::Parser;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(Cli::exit_code_for(&e));
        }
    };

    // 初始化日誌
    let debug = match &cli.command {
        Some(Command::Convert(args)) => args.debug,
        Some(_) => false,
        None => cli.convert.debug,
    };
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose || debug);
    }

    let outcome = match cli.into_command() {
        Command::Convert(args) => run_convert(args).await,
        Command::Init { dir } => run_init(&dir),
        Command::Clean { dir } => run_clean(&dir).await,
        Command::Inspect { file, json } => run_inspect(&file, json),
    };

    if let Err(e) = outcome {
        tracing::error!(
            "❌ Failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    Ok(())
}

async fn run_convert(args: ConvertArgs) -> Result<(), ConvertError> {
    tracing::info!("🚀 Starting ASC to CSV conversion");

    let (mut config, source) = ConvertConfig::load(args.config.as_deref())?;
    config.apply_overrides(args.overrides());

    display_config_summary(&config, source.as_deref());

    // 驗證配置
    config.validate().inspect_err(|e| {
        tracing::error!("❌ Configuration validation failed: {}", e);
    })?;
    config.create_output_dir()?;

    if let Some(path) = &args.save_config {
        config.save(path)?;
    }

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let output_dir = config.output_dir.clone();
    let storage = LocalStorage::new(&output_dir);
    let pipeline = ConversionPipeline::new(storage, config);
    let engine = EtlEngine::new_with_monitoring(pipeline, args.monitor);

    let report = engine.run().await?;
    print_conversion_report(&report);

    if args.clean {
        tracing::info!("🧹 Removing blank rows from {}", output_dir.display());
        let cleaner = CsvCleaner::new(LocalStorage::new(&output_dir));
        let results = cleaner.clean_directory().await?;
        print_clean_report(&results);
    }

    Ok(())
}

fn run_init(dir: &Path) -> Result<(), ConvertError> {
    let report = bootstrap::bootstrap(dir)?;

    match report.config {
        ConfigSeed::CopiedTemplate => println!(
            "✅ Created {} from {}",
            bootstrap::CONFIG_FILE_NAME,
            bootstrap::CONFIG_TEMPLATE_NAME
        ),
        ConfigSeed::WroteDefaults => {
            println!("✅ Created {} with default settings", bootstrap::CONFIG_FILE_NAME)
        }
        ConfigSeed::AlreadyExists => {
            println!("ℹ️  {} already exists, left untouched", bootstrap::CONFIG_FILE_NAME)
        }
    }
    match report.data_dir {
        DataDir::Created => println!("✅ Created {}/ directory", bootstrap::DATA_DIR_NAME),
        DataDir::AlreadyExists => {
            println!("ℹ️  {}/ directory already exists", bootstrap::DATA_DIR_NAME)
        }
    }

    println!("\nNext steps:");
    println!("  1. Put your .asc and .dbc files into {}/", bootstrap::DATA_DIR_NAME);
    println!("  2. Edit {} to point at them", bootstrap::CONFIG_FILE_NAME);
    println!("  3. Run: asc-to-csv");
    Ok(())
}

async fn run_clean(dir: &Path) -> Result<(), ConvertError> {
    if !dir.is_dir() {
        return Err(ConvertError::validation(format!(
            "Directory does not exist: {}",
            dir.display()
        )));
    }

    let cleaner = CsvCleaner::new(LocalStorage::new(dir));
    let results = cleaner.clean_directory().await?;
    if results.is_empty() {
        println!("No CSV files found in {}", dir.display());
        return Ok(());
    }
    print_clean_report(&results);
    Ok(())
}

fn run_inspect(file: &Path, json: bool) -> Result<(), ConvertError> {
    let loader = CsvDataLoader::load(file)?;
    let numeric = loader.numeric_columns();
    let stats: Vec<_> = numeric
        .iter()
        .filter_map(|column| loader.column_stats(column))
        .collect();

    if json {
        let summary = serde_json::json!({
            "file": file.display().to_string(),
            "rows": loader.row_count,
            "columns": loader.columns,
            "time_column": loader.time_column(),
            "time_range": loader.time_range(),
            "numeric_columns": stats,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("📄 {}", file.display());
    println!("  Rows: {}", loader.row_count);
    println!("  Columns: {}", loader.columns.len());
    if let Some(time) = loader.time_column() {
        match loader.time_range() {
            Some((start, end)) => println!("  Time column: {} ({} .. {})", time, start, end),
            None => println!("  Time column: {}", time),
        }
    }
    println!("  Numeric columns: {}", stats.len());
    for stat in &stats {
        println!(
            "    {}: n={} min={} max={} mean={:.3}",
            stat.column, stat.count, stat.min, stat.max, stat.mean
        );
    }
    Ok(())
}

fn display_config_summary(config: &ConvertConfig, source: Option<&Path>) {
    tracing::info!("📋 Configuration Summary:");
    match source {
        Some(path) => tracing::info!("  Config file: {}", path.display()),
        None => tracing::info!("  Config file: (none)"),
    }
    tracing::info!("  ASC file: {}", config.asc_file.display());
    for dbc in &config.dbc_files {
        tracing::info!("  DBC file: {}", dbc.display());
    }
    tracing::info!("  Output dir: {}", config.output_dir.display());
    tracing::info!("  Sample interval: {}s", config.sample_interval);
    tracing::info!("  Group size: {}", config.group_size);
    tracing::info!("  CSV encoding: {}", config.csv_encoding);
    if config.debug {
        tracing::info!("  Debug: enabled");
    }
}

fn print_conversion_report(report: &ConversionReport) {
    println!("✅ Conversion completed successfully!");
    println!("📁 Output saved to: {}", report.output_dir.display());
    println!(
        "  Data points: {}  Time points: {}  Groups: {}",
        report.stats.original_count,
        report.time_points,
        report.groups.len()
    );
    for (group, count) in &report.groups {
        println!("    {}: {} signals", group, count);
    }
    if report.stats.decode_errors > 0 {
        println!("  ⚠️  Frames that failed to decode: {}", report.stats.decode_errors);
    }
}
