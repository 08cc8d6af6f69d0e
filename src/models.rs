use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub const COLUMN_MEMBER_NUMBER: &str = "member_number";
pub const COLUMN_DIVISION: &str = "division";
pub const COLUMN_CLASSIFIER: &str = "stage_classifiercode";
pub const COLUMN_HIT_FACTOR: &str = "hit_factor";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Data source configuration
    pub data_source_mode: DataSourceMode,
    pub input_file: Option<String>,
    pub input_url: Option<String>,
    pub delimiter: char,
    pub output_directory: Option<String>,
    /// Length of the `top{N}.json` slice written next to `all.json`.
    pub top_n: usize,
    /// Admit rows whose division is only known through the alias table.
    pub admit_aliased_divisions: bool,
    /// Official high hit factor table used by the `summary` command.
    pub hhf_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceMode {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "internet")]
    Internet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source_mode: DataSourceMode::Local,
            input_file: Some("data.csv".to_string()),
            input_url: None,
            delimiter: ',',
            output_directory: Some("sorted".to_string()),
            top_n: 100,
            admit_aliased_divisions: false,
            hhf_file: None,
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    pub fn output_dir(&self) -> &str {
        self.output_directory.as_deref().unwrap_or("sorted")
    }
}

/// Supported competition divisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Division {
    Limited,
    Production,
    Open,
    CarryOptics,
    Pcc,
    SingleStack,
    Limited10,
    Revolver,
}

impl Division {
    pub const ALL: [Division; 8] = [
        Division::Limited,
        Division::Production,
        Division::Open,
        Division::CarryOptics,
        Division::Pcc,
        Division::SingleStack,
        Division::Limited10,
        Division::Revolver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Division::Limited => "LIMITED",
            Division::Production => "PRODUCTION",
            Division::Open => "OPEN",
            Division::CarryOptics => "CARRY OPTICS",
            Division::Pcc => "PCC",
            Division::SingleStack => "SINGLE STACK",
            Division::Limited10 => "LIMITED 10",
            Division::Revolver => "REVOLVER",
        }
    }

    /// Exact match against the canonical names. No trimming or case folding.
    pub fn from_canonical(text: &str) -> Option<Division> {
        Division::ALL.into_iter().find(|d| d.as_str() == text)
    }

    /// Shorthand spellings seen in exports.
    pub fn from_alias(text: &str) -> Option<Division> {
        match text {
            "LTD" => Some(Division::Limited),
            "PROD" => Some(Division::Production),
            "CO" => Some(Division::CarryOptics),
            "SS" => Some(Division::SingleStack),
            "LTDTEN" => Some(Division::Limited10),
            "REV" => Some(Division::Revolver),
            _ => None,
        }
    }

    /// Storage key: the canonical name with whitespace removed (`CARRYOPTICS`).
    pub fn storage_key(&self) -> String {
        strip_whitespace(self.as_str())
    }

    /// Reverse of `storage_key`, ignoring case and whitespace in `text`.
    pub fn from_storage_key(text: &str) -> Option<Division> {
        let key = strip_whitespace(text).to_uppercase();
        Division::ALL.into_iter().find(|d| d.storage_key() == key)
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Division {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// One input row: field name to raw text, in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub fields: Vec<(String, String)>,
}

impl RawRecord {
    /// Missing columns read as empty text.
    pub fn get(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedEntry {
    pub member_number: String,
    pub division: Division,
    pub stage_classifier_code: String,
    pub hit_factor: f64,
    /// Hit factor exactly as it appeared in the row (trimmed); part of the dedupe key.
    pub hit_factor_text: String,
    /// Every input column in header order, carried for display.
    pub fields: Vec<(String, String)>,
}

impl CleanedEntry {
    pub fn dedupe_key(&self) -> String {
        format!(
            "{};{};{};{}",
            self.member_number, self.stage_classifier_code, self.hit_factor_text, self.division
        )
    }
}

impl Serialize for CleanedEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            match key.as_str() {
                COLUMN_MEMBER_NUMBER => map.serialize_entry(key, &self.member_number)?,
                COLUMN_DIVISION => map.serialize_entry(key, &self.division)?,
                COLUMN_CLASSIFIER => map.serialize_entry(key, &self.stage_classifier_code)?,
                COLUMN_HIT_FACTOR => map.serialize_entry(key, &self.hit_factor)?,
                _ => map.serialize_entry(key, value)?,
            }
        }
        map.end()
    }
}
