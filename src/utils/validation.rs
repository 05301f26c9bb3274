use crate::utils::error::{ConvertError, Result};
use std::fs::File;
use std::path::Path;

pub const MAX_PATH_LENGTH: usize = 4096;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ConvertError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ConvertError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    if path.len() > MAX_PATH_LENGTH {
        return Err(ConvertError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}...", path.chars().take(64).collect::<String>()),
            reason: format!("Path length {} exceeds {}", path.len(), MAX_PATH_LENGTH),
        });
    }

    Ok(())
}

/// 確認檔案存在、是一般檔案且可讀取
pub fn validate_readable_file(field_name: &str, path: &Path) -> Result<()> {
    let display = path.display().to_string();
    validate_path(field_name, &display)?;

    if !path.exists() {
        return Err(ConvertError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: display,
            reason: "File does not exist".to_string(),
        });
    }

    if !path.is_file() {
        return Err(ConvertError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: display,
            reason: "Path is not a regular file".to_string(),
        });
    }

    File::open(path).map_err(|e| ConvertError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: display,
        reason: format!("File is not readable: {}", e),
    })?;

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(ConvertError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_positive_float(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConvertError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be greater than 0".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_list<T>(field_name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(ConvertError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    Ok(())
}
