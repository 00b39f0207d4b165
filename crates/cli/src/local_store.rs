use std::{fs, path::PathBuf};

use engine::{ForcingRule, HistoryEntry, HistoryLog};
use uuid::Uuid;

use crate::error::Result;

const HISTORY_FILE: &str = "calculator_history.json";
const RULE_FILE: &str = "forced_number.json";
const DEVICE_ID_FILE: &str = "device_id";

/// JSON-file persistence for the calculator's device-local state.
///
/// A missing file reads as the empty default, so a fresh install needs no
/// setup step.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(&self, file: &str) -> Result<T> {
        let content = match fs::read_to_string(self.path(file)) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(T::default());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn write_json<T: serde::Serialize>(&self, file: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let payload = serde_json::to_string_pretty(value)?;
        fs::write(self.path(file), payload)?;
        Ok(())
    }

    /// The on-disk file may exceed the entry cap (older builds, hand
    /// edits); the cap is reapplied on load.
    pub fn load_history(&self) -> Result<HistoryLog> {
        let entries: Vec<HistoryEntry> = self.read_json(HISTORY_FILE)?;
        Ok(HistoryLog::new(entries))
    }

    pub fn save_history(&self, log: &HistoryLog) -> Result<()> {
        self.write_json(HISTORY_FILE, log)
    }

    pub fn load_rule(&self) -> Result<ForcingRule> {
        self.read_json(RULE_FILE)
    }

    pub fn save_rule(&self, rule: &ForcingRule) -> Result<()> {
        self.write_json(RULE_FILE, rule)
    }

    /// Stable per-device identifier, generated once on first use.
    pub fn device_id(&self) -> Result<String> {
        let path = self.path(DEVICE_ID_FILE);
        match fs::read_to_string(&path) {
            Ok(id) if !id.trim().is_empty() => return Ok(id.trim().to_string()),
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let id = Uuid::new_v4().to_string();
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, &id)?;
        Ok(id)
    }
}
