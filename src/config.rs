use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Daily extraction quota for non-premium identities.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default)]
    pub premium: bool,
    /// Account id for quota attribution; empty means guest.
    #[serde(default)]
    pub account: String,
    /// When set, a CSV bundle of every batch is written under this directory.
    #[serde(default)]
    pub csv_dir: String,
    pub llm: LlmSection,
    #[serde(default)]
    pub sheet: SheetSection,
}

fn default_db_path() -> String {
    "store/results.db".to_string()
}

fn default_daily_limit() -> u32 {
    3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    Ollama,
    Remote,
}

#[derive(Deserialize)]
pub struct LlmSection {
    pub backend: LlmBackend,
    #[serde(default = "default_ollama")]
    pub ollama: LlmEndpoint,
    #[serde(default = "default_remote")]
    pub remote: LlmEndpoint,
}

#[derive(Deserialize)]
pub struct LlmEndpoint {
    pub base_url: String,
    pub model: String,
}

fn default_ollama() -> LlmEndpoint {
    LlmEndpoint {
        base_url: "http://localhost:11434/v1".to_string(),
        model: "qwen2.5vl:7b".to_string(),
    }
}

fn default_remote() -> LlmEndpoint {
    LlmEndpoint {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o".to_string(),
    }
}

/// Spreadsheet write-back target. Export is skipped entirely when the
/// spreadsheet id is empty.
#[derive(Default, Deserialize)]
pub struct SheetSection {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default)]
    pub gas_url: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let cfg: Config = toml::from_str(
            r#"
            [llm]
            backend = "ollama"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.llm.backend, LlmBackend::Ollama);
        assert_eq!(cfg.daily_limit, 3);
        assert_eq!(cfg.db_path, "store/results.db");
        assert!(!cfg.premium);
        assert!(cfg.sheet.spreadsheet_id.is_empty());
    }

    #[test]
    fn test_full_config() {
        let cfg: Config = toml::from_str(
            r#"
            db_path = "x.db"
            daily_limit = 10
            premium = true
            account = "user-7"

            [llm]
            backend = "remote"
            [llm.remote]
            base_url = "https://api.example.com/v1"
            model = "vision-large"

            [sheet]
            spreadsheet_id = "sheet123"
            gas_url = "https://script.google.com/macros/s/abc/exec"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.llm.backend, LlmBackend::Remote);
        assert_eq!(cfg.llm.remote.model, "vision-large");
        assert_eq!(cfg.daily_limit, 10);
        assert_eq!(cfg.account, "user-7");
        assert_eq!(cfg.sheet.spreadsheet_id, "sheet123");
    }
}
