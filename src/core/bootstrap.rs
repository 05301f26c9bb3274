use crate::config::file_config::ConvertConfig;
use crate::utils::error::{ConvertError, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CONFIG_TEMPLATE_NAME: &str = "config.example.json";
pub const DATA_DIR_NAME: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeed {
    CopiedTemplate,
    WroteDefaults,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDir {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub root: PathBuf,
    pub config: ConfigSeed,
    pub data_dir: DataDir,
}

/// 初始化工作目錄：建立 config.json 與 data/ 目錄
///
/// Fails before touching anything when `root` is not an existing directory.
pub fn bootstrap(root: &Path) -> Result<BootstrapReport> {
    if !root.is_dir() {
        return Err(ConvertError::InvalidConfigValueError {
            field: "directory".to_string(),
            value: root.display().to_string(),
            reason: "Not an existing directory".to_string(),
        });
    }

    let config = seed_config(root)?;
    let data_dir = ensure_data_dir(root)?;

    Ok(BootstrapReport {
        root: root.to_path_buf(),
        config,
        data_dir,
    })
}

fn seed_config(root: &Path) -> Result<ConfigSeed> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        tracing::info!("Config file already exists: {}", config_path.display());
        return Ok(ConfigSeed::AlreadyExists);
    }

    let template_path = root.join(CONFIG_TEMPLATE_NAME);
    if template_path.is_file() {
        std::fs::copy(&template_path, &config_path)?;
        tracing::info!(
            "Created {} from {}",
            config_path.display(),
            template_path.display()
        );
        return Ok(ConfigSeed::CopiedTemplate);
    }

    ConvertConfig::template().save(&config_path)?;
    tracing::warn!(
        "{} not found, wrote default settings to {}",
        CONFIG_TEMPLATE_NAME,
        config_path.display()
    );
    Ok(ConfigSeed::WroteDefaults)
}

fn ensure_data_dir(root: &Path) -> Result<DataDir> {
    let data_dir = root.join(DATA_DIR_NAME);
    if data_dir.is_dir() {
        tracing::info!("Data directory already exists: {}", data_dir.display());
        return Ok(DataDir::AlreadyExists);
    }
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Created data directory: {}", data_dir.display());
    Ok(DataDir::Created)
}
