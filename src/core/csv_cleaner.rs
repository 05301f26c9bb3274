use crate::domain::ports::Storage;
use crate::utils::error::{ConvertError, Result};
use serde::Serialize;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanCounts {
    pub original_rows: usize,
    pub cleaned_rows: usize,
    pub removed_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanResult {
    pub file: String,
    pub outcome: std::result::Result<CleanCounts, String>,
}

/// 空白行：沒有欄位，或所有欄位都只含空白字元
pub fn is_empty_row<S: AsRef<str>>(cells: &[S]) -> bool {
    cells.iter().all(|cell| cell.as_ref().trim().is_empty())
}

/// `\r\n`, `\r` and `\n` each count as one line break.
fn count_line_breaks(bytes: &[u8]) -> usize {
    let mut breaks = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                breaks += 1;
                i += 2;
            }
            b'\r' | b'\n' => {
                breaks += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    breaks
}

/// Drops blank rows and rewrites the remaining records with CRLF endings.
/// A leading BOM is preserved. Quoted fields may span lines.
///
/// The csv reader skips empty lines silently, so they are counted as the
/// line breaks not owned by any record.
pub fn clean_bytes(input: &[u8]) -> Result<(Vec<u8>, CleanCounts)> {
    let (bom, body) = match input.strip_prefix(UTF8_BOM) {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    std::str::from_utf8(body).map_err(|e| {
        ConvertError::validation(format!(
            "CSV is not valid UTF-8 (invalid byte at offset {})",
            e.valid_up_to()
        ))
    })?;

    let mut counts = CleanCounts::default();
    let mut out = if bom { UTF8_BOM.to_vec() } else { Vec::new() };
    let mut records = 0;
    let mut owned_breaks = 0;

    {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body);
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::CRLF)
            .from_writer(&mut out);

        for record in reader.records() {
            let record = record?;
            records += 1;
            owned_breaks += record.iter().map(|f| count_line_breaks(f.as_bytes())).sum::<usize>();

            if is_empty_row(&record.iter().collect::<Vec<_>>()) {
                counts.removed_rows += 1;
            } else {
                counts.cleaned_rows += 1;
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;
    }

    // 每筆紀錄擁有自己的結尾換行，最後一筆可能沒有
    let terminated = body.last().is_some_and(|b| matches!(b, b'\r' | b'\n'));
    owned_breaks += if records > 0 && !terminated {
        records - 1
    } else {
        records
    };
    let empty_lines = count_line_breaks(body).saturating_sub(owned_breaks);

    counts.removed_rows += empty_lines;
    counts.original_rows = records + empty_lines;
    Ok((out, counts))
}

/// 清理儲存區中 CSV 檔案的空白行
pub struct CsvCleaner<S: Storage> {
    storage: S,
}

impl<S: Storage> CsvCleaner<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Cleans `input` into `output` (in place when `None`).
    pub async fn clean_file(&self, input: &str, output: Option<&str>) -> Result<CleanCounts> {
        let data = self.storage.read_file(input).await?;
        let (cleaned, counts) = clean_bytes(&data)?;
        self.storage
            .write_file(output.unwrap_or(input), &cleaned)
            .await?;
        tracing::debug!(
            "Cleaned {}: {} -> {} rows",
            input,
            counts.original_rows,
            counts.cleaned_rows
        );
        Ok(counts)
    }

    /// Every `*.csv` under the storage root; a failing file does not stop the others.
    pub async fn clean_directory(&self) -> Result<Vec<CleanResult>> {
        let files = self.storage.list_files("csv").await?;
        let mut results = Vec::with_capacity(files.len());

        for file in files {
            let outcome = match self.clean_file(&file, None).await {
                Ok(counts) => Ok(counts),
                Err(e) => {
                    tracing::warn!("Failed to clean {}: {}", file, e);
                    Err(e.to_string())
                }
            };
            results.push(CleanResult { file, outcome });
        }

        Ok(results)
    }
}

pub fn print_clean_report(results: &[CleanResult]) {
    let mut total = CleanCounts::default();
    let mut succeeded = 0;

    println!("\n{}", "=".repeat(60));
    println!("CSV blank row cleanup report");
    println!("{}", "=".repeat(60));

    for result in results {
        println!("\nFile: {}", result.file);
        match &result.outcome {
            Ok(counts) => {
                println!("  Original rows: {}", counts.original_rows);
                println!("  Rows after cleanup: {}", counts.cleaned_rows);
                println!("  Blank rows removed: {}", counts.removed_rows);
                total.original_rows += counts.original_rows;
                total.cleaned_rows += counts.cleaned_rows;
                total.removed_rows += counts.removed_rows;
                succeeded += 1;
            }
            Err(e) => println!("  Failed: {}", e),
        }
    }

    println!("\n{}", "-".repeat(60));
    println!("Totals:");
    println!("  Files processed: {}", succeeded);
    println!("  Original rows: {}", total.original_rows);
    println!("  Rows after cleanup: {}", total.cleaned_rows);
    println!("  Blank rows removed: {}", total.removed_rows);
    println!("{}", "=".repeat(60));
}
