use super::parser::{decode_text, parse_dbc};
use super::{Database, Message};
use crate::utils::error::{ConvertError, Result};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct SignalInfo {
    /// `<dbc file>::<message>::<signal>`
    pub full_name: String,
    pub name: String,
    pub unit: String,
    pub message: String,
    pub dbc: String,
}

impl SignalInfo {
    /// CSV 欄位標題：`名稱[單位]`，無單位時只有名稱
    pub fn column_header(&self) -> String {
        if self.unit.is_empty() {
            self.name.clone()
        } else {
            format!("{}[{}]", self.name, self.unit)
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageEntry {
    pub message: Message,
    pub dbc_name: String,
    /// Catalog signal id for each entry of `message.signals`.
    pub signal_ids: Vec<usize>,
}

/// All loaded DBC files merged into one frame-id lookup.
///
/// A frame id defined by several files resolves to the file loaded last;
/// signal info from every file is kept.
#[derive(Debug, Clone, Default)]
pub struct SignalCatalog {
    message_map: HashMap<u32, MessageEntry>,
    signals: Vec<SignalInfo>,
    ids_by_name: HashMap<String, usize>,
}

impl SignalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依序載入 DBC 檔案，任何一個失敗即中止
    pub fn load<P: AsRef<Path>>(dbc_files: &[P]) -> Result<Self> {
        let mut catalog = Self::new();
        for path in dbc_files {
            catalog.load_file(path.as_ref())?;
        }
        Ok(catalog)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            return Err(ConvertError::validation(format!(
                "DBC file does not exist: {}",
                path.display()
            )));
        }

        let dbc_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = std::fs::read(path).map_err(|e| {
            tracing::error!("Failed to read DBC file {}: {}", path.display(), e);
            ConvertError::IoError(e)
        })?;
        let database = parse_dbc(&dbc_name, &decode_text(&bytes))?;
        let count = self.add_database(&dbc_name, database);

        tracing::info!("  Loaded DBC: {} - messages: {}", path.display(), count);
        Ok(count)
    }

    /// Registers every message of `database` under `dbc_name`, returns how many.
    pub fn add_database(&mut self, dbc_name: &str, database: Database) -> usize {
        let count = database.messages.len();
        for message in database.messages {
            let signal_ids = message
                .signals
                .iter()
                .map(|signal| {
                    self.register_signal(SignalInfo {
                        full_name: format!("{}::{}::{}", dbc_name, message.name, signal.name),
                        name: signal.name.clone(),
                        unit: signal.unit.clone(),
                        message: message.name.clone(),
                        dbc: dbc_name.to_string(),
                    })
                })
                .collect();

            if let Some(previous) = self.message_map.get(&message.frame_id) {
                tracing::debug!(
                    "Frame 0x{:X}: {} ({}) replaces {} ({})",
                    message.frame_id,
                    message.name,
                    dbc_name,
                    previous.message.name,
                    previous.dbc_name
                );
            }

            self.message_map.insert(
                message.frame_id,
                MessageEntry {
                    message,
                    dbc_name: dbc_name.to_string(),
                    signal_ids,
                },
            );
        }
        count
    }

    fn register_signal(&mut self, info: SignalInfo) -> usize {
        if let Some(&id) = self.ids_by_name.get(&info.full_name) {
            self.signals[id] = info;
            return id;
        }
        let id = self.signals.len();
        self.ids_by_name.insert(info.full_name.clone(), id);
        self.signals.push(info);
        id
    }

    pub fn message(&self, frame_id: u32) -> Option<&MessageEntry> {
        self.message_map.get(&frame_id)
    }

    pub fn signal(&self, id: usize) -> Option<&SignalInfo> {
        self.signals.get(id)
    }

    pub fn signal_id(&self, full_name: &str) -> Option<usize> {
        self.ids_by_name.get(full_name).copied()
    }

    pub fn signals(&self) -> &[SignalInfo] {
        &self.signals
    }

    /// 可解碼的訊息數（依 frame id 去重）
    pub fn message_count(&self) -> usize {
        self.message_map.len()
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub fn frame_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.message_map.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: &str = "BO_ 100 BatP1_Status: 8 BMS\n SG_ Volt : 0|16@1+ (0.1,0) [0|0] \"V\" X\n";
    const SECOND: &str = "BO_ 100 Replacement: 8 BMS\n SG_ Other : 0|8@1+ (1,0) [0|0] \"\" X\n";

    #[test]
    fn test_signal_names_and_headers() {
        let mut catalog = SignalCatalog::new();
        catalog.add_database("pack.dbc", parse_dbc("pack.dbc", FIRST).unwrap());

        let entry = catalog.message(100).unwrap();
        assert_eq!(entry.dbc_name, "pack.dbc");
        let info = catalog.signal(entry.signal_ids[0]).unwrap();
        assert_eq!(info.full_name, "pack.dbc::BatP1_Status::Volt");
        assert_eq!(info.column_header(), "Volt[V]");
    }

    #[test]
    fn test_later_database_wins_frame_id() {
        let mut catalog = SignalCatalog::new();
        catalog.add_database("a.dbc", parse_dbc("a.dbc", FIRST).unwrap());
        catalog.add_database("b.dbc", parse_dbc("b.dbc", SECOND).unwrap());

        assert_eq!(catalog.message(100).unwrap().message.name, "Replacement");
        assert_eq!(catalog.message_count(), 1);
        assert_eq!(catalog.signal_count(), 2);
        assert!(catalog.signal_id("a.dbc::BatP1_Status::Volt").is_some());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = SignalCatalog::load(&[dir.path().join("missing.dbc")]);
        assert!(matches!(result, Err(ConvertError::ValidationError { .. })));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pack.dbc");
        std::fs::write(&path, FIRST).unwrap();

        let catalog = SignalCatalog::load(&[path]).unwrap();
        assert_eq!(catalog.frame_ids(), vec![100]);
    }
}
