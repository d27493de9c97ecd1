use std::fs;
use std::path::{Path, PathBuf};

use ini::{EscapePolicy, Ini, ParseOption};

use super::Result;

pub const DEFAULT_CONFIG_PATH: &str = "./config/smock.cfg";

const SECTION: &str = "DEFAULT";
const PORT_KEY: &str = "comport";

/// The persisted endpoint of the last auto-selected device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub endpoint_identifier: String,
}

/// INI file in the layout the desktop tool has always written:
///
/// ```text
/// [DEFAULT]
/// comport = COM3
/// ```
///
/// Keys are matched case-insensitively and values are taken verbatim.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted endpoint. A missing file means no endpoint.
    pub fn load(&self) -> Result<Option<LinkConfig>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let file = Ini::load_from_str_opt(&contents, options)?;

        let endpoint = file.section(Some(SECTION)).and_then(|props| {
            props
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(PORT_KEY))
                .map(|(_, value)| value.trim().to_string())
        });
        Ok(endpoint.map(|endpoint_identifier| LinkConfig { endpoint_identifier }))
    }

    /// Replace the whole file with `config`. Not crash-safe.
    pub fn save(&self, config: &LinkConfig) -> Result<()> {
        let mut file = Ini::new();
        file.with_section(Some(SECTION))
            .set(PORT_KEY, config.endpoint_identifier.as_str());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        file.write_to_file_policy(&self.path, EscapePolicy::Nothing)?;

        log::info!(
            "Saved {} as default port in {}",
            config.endpoint_identifier,
            self.path.display()
        );
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}
