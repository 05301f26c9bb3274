use crate::utils::error::{ConvertError, Result};
use serde::Serialize;
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() {
            Cell::Missing
        } else if let Ok(number) = value.parse::<f64>() {
            Cell::Number(number)
        } else {
            Cell::Text(value.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// 讀取轉換後的 CSV，供檢視或繪圖使用
#[derive(Debug, Clone, Default)]
pub struct CsvDataLoader {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Cell>>,
    pub row_count: usize,
}

impl CsvDataLoader {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Header row names the columns; blank lines are skipped, short rows padded.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body);

        let mut records = reader.records();
        let columns: Vec<String> = match records.next() {
            Some(header) => header?.iter().map(str::to_string).collect(),
            None => return Err(ConvertError::validation("CSV file has no header row")),
        };

        let mut loader = Self {
            data: vec![Vec::new(); columns.len()],
            columns,
            row_count: 0,
        };

        for record in records {
            let record = record?;
            // 只略過真正的空行；`,,` 這種全空欄位的列仍算一列
            if record.is_empty() || (record.len() == 1 && record[0].is_empty()) {
                continue;
            }
            loader.row_count += 1;
            for (i, column) in loader.data.iter_mut().enumerate() {
                column.push(record.get(i).map_or(Cell::Missing, Cell::parse));
            }
        }

        Ok(loader)
    }

    /// 第一個名稱含 "time" 的欄位，否則第一欄
    pub fn time_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.to_lowercase().contains("time"))
            .or_else(|| self.columns.first())
            .map(String::as_str)
    }

    /// Non-time columns with at least one value, all of them numeric.
    pub fn numeric_columns(&self) -> Vec<&str> {
        let time = self.time_column();
        self.columns
            .iter()
            .zip(&self.data)
            .filter(|(name, _)| Some(name.as_str()) != time)
            .filter(|(_, cells)| {
                let mut present = cells.iter().filter(|c| **c != Cell::Missing).peekable();
                present.peek().is_some() && present.all(|c| matches!(c, Cell::Number(_)))
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(&self.data[index])
    }

    /// (x, y) pairs where both the time and the column have numeric values.
    pub fn series(&self, name: &str) -> Vec<(f64, f64)> {
        let (Some(time), Some(values)) = (self.time_column().and_then(|t| self.column(t)), self.column(name))
        else {
            return Vec::new();
        };
        time.iter()
            .zip(values)
            .filter_map(|pair| match pair {
                (Cell::Number(x), Cell::Number(y)) => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }

    pub fn column_stats(&self, name: &str) -> Option<ColumnStats> {
        let numbers: Vec<f64> = self
            .column(name)?
            .iter()
            .filter_map(|c| match c {
                Cell::Number(v) => Some(*v),
                _ => None,
            })
            .collect();
        if numbers.is_empty() {
            return None;
        }
        let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
        Some(ColumnStats {
            column: name.to_string(),
            count: numbers.len(),
            min,
            max,
            mean,
        })
    }

    pub fn time_range(&self) -> Option<(f64, f64)> {
        let stats = self.column_stats(self.time_column()?)?;
        Some((stats.min, stats.max))
    }
}
