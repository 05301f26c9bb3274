use crate::core::csv_writer::CsvEncoding;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ConvertError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "ASC_TO_CSV_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// 超過此採樣間隔時只提出警告
const LONG_INTERVAL_WARNING_SECS: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub asc_file: PathBuf,
    pub dbc_files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub sample_interval: f64,
    pub group_size: usize,
    pub csv_encoding: String,
    pub debug: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            asc_file: PathBuf::new(),
            dbc_files: Vec::new(),
            output_dir: PathBuf::new(),
            sample_interval: 0.1,
            group_size: 5,
            csv_encoding: "utf-8-sig".to_string(),
            debug: false,
        }
    }
}

/// Values given on the command line; relative paths resolve against the
/// current directory.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub asc_file: Option<PathBuf>,
    pub dbc_files: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub sample_interval: Option<f64>,
    pub group_size: Option<usize>,
    pub csv_encoding: Option<String>,
    pub debug: bool,
}

impl ConvertConfig {
    /// 新工作目錄使用的範本設定
    pub fn template() -> Self {
        Self {
            asc_file: PathBuf::from("data/input.asc"),
            dbc_files: vec![PathBuf::from("data/database.dbc")],
            output_dir: PathBuf::from("output"),
            ..Default::default()
        }
    }

    /// 從 JSON 或 TOML 檔案載入（依副檔名），相對路徑以設定檔所在目錄為基準
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let mut config = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        config.resolve_paths(&absolute(&base));
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ConvertError::ConfigError {
            message: format!("JSON parsing error: {}", e),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConvertError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 設定檔搜尋順序：明確指定 > 環境變數 > 目前目錄 > 執行檔目錄
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::locate_in(explicit, env_path, Path::new(""), exe_dir.as_deref())
    }

    fn locate_in(
        explicit: Option<&Path>,
        env_path: Option<PathBuf>,
        cwd: &Path,
        exe_dir: Option<&Path>,
    ) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        if let Some(env_path) = env_path {
            if env_path.is_file() {
                return Some(env_path);
            }
            tracing::warn!(
                "{} points to a missing file: {}",
                CONFIG_ENV_VAR,
                env_path.display()
            );
        }

        let local = cwd.join(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }

        exe_dir
            .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
            .filter(|p| p.is_file())
    }

    /// Loads the located config file, or defaults when there is none.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        match Self::locate(explicit) {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path.display());
                let config = Self::from_file(&path).map_err(|e| match e {
                    ConvertError::IoError(io) => ConvertError::ConfigError {
                        message: format!("cannot read {}: {}", path.display(), io),
                    },
                    other => other,
                })?;
                Ok((config, Some(path)))
            }
            None => {
                tracing::warn!(
                    "No config file found; create {} (asc-to-csv init) or set {}",
                    DEFAULT_CONFIG_FILE,
                    CONFIG_ENV_VAR
                );
                Ok((Self::default(), None))
            }
        }
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        self.asc_file = resolve_path(&self.asc_file, base);
        self.dbc_files = self.dbc_files.iter().map(|p| resolve_path(p, base)).collect();
        self.output_dir = resolve_path(&self.output_dir, base);
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let cwd = absolute(Path::new("."));
        if let Some(asc) = overrides.asc_file {
            self.asc_file = resolve_path(&asc, &cwd);
        }
        if !overrides.dbc_files.is_empty() {
            self.dbc_files = overrides
                .dbc_files
                .iter()
                .map(|p| resolve_path(p, &cwd))
                .collect();
        }
        if let Some(output) = overrides.output_dir {
            self.output_dir = resolve_path(&output, &cwd);
        }
        if let Some(interval) = overrides.sample_interval {
            self.sample_interval = interval;
        }
        if let Some(size) = overrides.group_size {
            self.group_size = size;
        }
        if let Some(encoding) = overrides.csv_encoding {
            self.csv_encoding = encoding;
        }
        self.debug |= overrides.debug;
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        std::fs::write(path, json)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    pub fn encoding(&self) -> Result<CsvEncoding> {
        self.csv_encoding.parse()
    }

    pub fn create_output_dir(&self) -> Result<()> {
        validation::validate_path("output_dir", &self.output_dir.to_string_lossy())?;
        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir).map_err(|e| {
                tracing::error!(
                    "Failed to create output directory {}: {}",
                    self.output_dir.display(),
                    e
                );
                ConvertError::IoError(e)
            })?;
            tracing::info!("Created output directory: {}", self.output_dir.display());
        }
        Ok(())
    }
}

impl Validate for ConvertConfig {
    fn validate(&self) -> Result<()> {
        if self.asc_file.as_os_str().is_empty() {
            return Err(ConvertError::MissingConfigError {
                field: "asc_file".to_string(),
            });
        }
        validation::validate_readable_file("asc_file", &self.asc_file)?;

        validation::validate_non_empty_list("dbc_files", &self.dbc_files)?;
        for dbc in &self.dbc_files {
            validation::validate_readable_file("dbc_files", dbc)?;
        }

        validation::validate_positive_float("sample_interval", self.sample_interval)?;
        if self.sample_interval > LONG_INTERVAL_WARNING_SECS {
            tracing::warn!(
                "⚠️ sample_interval {}s exceeds one hour, most samples will be merged",
                self.sample_interval
            );
        }

        validation::validate_positive_number("group_size", self.group_size, 1)?;

        if self.output_dir.as_os_str().is_empty() {
            return Err(ConvertError::MissingConfigError {
                field: "output_dir".to_string(),
            });
        }
        validation::validate_path("output_dir", &self.output_dir.to_string_lossy())?;

        self.encoding()?;

        Ok(())
    }
}

impl ConfigProvider for ConvertConfig {
    fn asc_file(&self) -> &Path {
        &self.asc_file
    }

    fn dbc_files(&self) -> &[PathBuf] {
        &self.dbc_files
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn sample_interval(&self) -> f64 {
        self.sample_interval
    }

    fn group_size(&self) -> usize {
        self.group_size
    }

    fn csv_encoding(&self) -> &str {
        &self.csv_encoding
    }

    fn debug(&self) -> bool {
        self.debug
    }
}

/// Empty paths stay empty; relative ones are joined to `base`; all are
/// lexically normalized.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        return PathBuf::new();
    }
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    }
}

/// 去除 `.`、折疊 `..`，不存取檔案系統
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !matches!(
                    normalized.components().next_back(),
                    Some(Component::RootDir | Component::Prefix(_))
                ) {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_missing_keys() {
        let config = ConvertConfig::from_json_str(r#"{"asc_file": "a.asc"}"#).unwrap();
        assert_eq!(config.asc_file, PathBuf::from("a.asc"));
        assert_eq!(config.sample_interval, 0.1);
        assert_eq!(config.group_size, 5);
        assert_eq!(config.csv_encoding, "utf-8-sig");
        assert!(!config.debug);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ConvertConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConvertError::ConfigError { .. }));
        let err = ConvertConfig::from_json_str(r#"{"group_size": "five"}"#).unwrap_err();
        assert!(matches!(err, ConvertError::ConfigError { .. }));
    }

    #[test]
    fn test_toml_config() {
        let config = ConvertConfig::from_toml_str(
            "asc_file = \"log.asc\"\ndbc_files = [\"a.dbc\", \"b.dbc\"]\ngroup_size = 10\n",
        )
        .unwrap();
        assert_eq!(config.dbc_files.len(), 2);
        assert_eq!(config.group_size, 10);
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"asc_file": "data/../data/log.asc", "dbc_files": ["data/a.dbc"], "output_dir": "./out"}"#,
        )
        .unwrap();

        let config = ConvertConfig::from_file(&path).unwrap();
        let base = absolute(dir.path());
        assert_eq!(config.asc_file, normalize_path(&base.join("data/log.asc")));
        assert_eq!(config.dbc_files[0], normalize_path(&base.join("data/a.dbc")));
        assert_eq!(config.output_dir, normalize_path(&base.join("out")));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = ConvertConfig::template();
        config.apply_overrides(ConfigOverrides {
            group_size: Some(9),
            csv_encoding: Some("utf-8".to_string()),
            dbc_files: vec![PathBuf::from("/tmp/x.dbc")],
            debug: true,
            ..Default::default()
        });
        assert_eq!(config.group_size, 9);
        assert_eq!(config.csv_encoding, "utf-8");
        assert_eq!(config.dbc_files, vec![PathBuf::from("/tmp/x.dbc")]);
        assert!(config.debug);
        assert_eq!(config.sample_interval, 0.1);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_validation_failures() {
        let dir = tempfile::tempdir().unwrap();
        let asc = dir.path().join("log.asc");
        let dbc = dir.path().join("db.dbc");
        std::fs::write(&asc, "").unwrap();
        std::fs::write(&dbc, "").unwrap();

        let valid = ConvertConfig {
            asc_file: asc.clone(),
            dbc_files: vec![dbc.clone()],
            output_dir: dir.path().join("out"),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());

        let mut missing_asc = valid.clone();
        missing_asc.asc_file = PathBuf::new();
        assert!(matches!(
            missing_asc.validate(),
            Err(ConvertError::MissingConfigError { .. })
        ));

        let mut no_dbc = valid.clone();
        no_dbc.dbc_files.clear();
        assert!(no_dbc.validate().is_err());

        let mut bad_interval = valid.clone();
        bad_interval.sample_interval = 0.0;
        assert!(bad_interval.validate().is_err());

        let mut bad_group = valid.clone();
        bad_group.group_size = 0;
        assert!(bad_group.validate().is_err());

        let mut bad_encoding = valid.clone();
        bad_encoding.csv_encoding = "latin-1".to_string();
        assert!(bad_encoding.validate().is_err());

        let mut long_interval = valid;
        long_interval.sample_interval = 7200.0;
        assert!(long_interval.validate().is_ok());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let config = ConvertConfig::template();
        config.save(&path).unwrap();
        assert_eq!(ConvertConfig::from_json_str(&std::fs::read_to_string(&path).unwrap()).unwrap(), config);
    }

    fn config_dirs() -> (tempfile::TempDir, PathBuf, PathBuf, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let cwd = root.path().join("cwd");
        let exe = root.path().join("bin");
        let env = root.path().join("env");
        for dir in [&cwd, &exe, &env] {
            std::fs::create_dir(dir).unwrap();
            std::fs::write(dir.join(DEFAULT_CONFIG_FILE), "{}").unwrap();
        }
        (root, cwd, exe, env)
    }

    #[test]
    fn test_locate_order() {
        let (_root, cwd, exe, env) = config_dirs();
        let env_file = env.join(DEFAULT_CONFIG_FILE);
        let explicit = Path::new("given.toml");

        assert_eq!(
            ConvertConfig::locate_in(Some(explicit), Some(env_file.clone()), &cwd, Some(&exe)),
            Some(explicit.to_path_buf())
        );
        assert_eq!(
            ConvertConfig::locate_in(None, Some(env_file.clone()), &cwd, Some(&exe)),
            Some(env_file)
        );
        assert_eq!(
            ConvertConfig::locate_in(None, None, &cwd, Some(&exe)),
            Some(cwd.join(DEFAULT_CONFIG_FILE))
        );

        std::fs::remove_file(cwd.join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(
            ConvertConfig::locate_in(None, None, &cwd, Some(&exe)),
            Some(exe.join(DEFAULT_CONFIG_FILE))
        );

        std::fs::remove_file(exe.join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(ConvertConfig::locate_in(None, None, &cwd, Some(&exe)), None);
    }

    #[test]
    fn test_locate_skips_missing_env_file() {
        let (_root, cwd, exe, env) = config_dirs();
        let missing = env.join("missing.json");

        assert_eq!(
            ConvertConfig::locate_in(None, Some(missing), &cwd, Some(&exe)),
            Some(cwd.join(DEFAULT_CONFIG_FILE))
        );
    }

    #[test]
    fn test_locate_reads_env_var() {
        let (_root, _cwd, _exe, env) = config_dirs();
        let env_file = env.join(DEFAULT_CONFIG_FILE);

        std::env::set_var(CONFIG_ENV_VAR, &env_file);
        let found = ConvertConfig::locate(None);
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(found, Some(env_file));
    }
}
