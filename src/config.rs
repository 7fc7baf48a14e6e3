use crate::error::{PlaceViewError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// APIベースURLを上書きする環境変数
pub const API_BASE_ENV: &str = "PLACE_VIEW_API_BASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub poll_interval_secs: u64,
    pub timeout_seconds: u64,
    pub default_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PlaceViewError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("place-view").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000".into(),
            poll_interval_secs: 3,
            timeout_seconds: 30,
            default_limit: 50,
        }
    }

    /// 使用するAPIベースURL（CLI引数 → 環境変数 → 設定ファイル）
    pub fn resolve_api_base(&self, cli_override: Option<&str>) -> String {
        let env = std::env::var(API_BASE_ENV).ok();
        self.resolve_api_base_with(cli_override, env.as_deref())
    }

    /// 環境変数の値を引数で受け取る版（空白のみの値は未設定扱い）
    pub fn resolve_api_base_with(&self, cli_override: Option<&str>, env: Option<&str>) -> String {
        let base = cli_override
            .or(env.filter(|v| !v.trim().is_empty()))
            .unwrap_or(self.api_base.as_str());
        base.trim().trim_end_matches('/').to_string()
    }

    pub fn set_api_base(&mut self, base: String) -> Result<()> {
        let base = base.trim().to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(PlaceViewError::Config(format!(
                "APIベースURLは http:// または https:// で始めてください: {}",
                base
            )));
        }
        self.api_base = base;
        self.save()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}
