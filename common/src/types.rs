//! 検索・ジョブ監視の型定義
//!
//! クライアント全体で使う型:
//! - Place: 検索エンドポイントが返す1件の事業所レコード
//! - FilterState / SortState: 画面が保持する検索条件と並び順
//! - JobState / EtlStatus: バックエンドジョブのスナップショット
//! - CountRow: テーブル件数

use crate::ranking::SortColumn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 事業所レコード
///
/// 検索のたびに丸ごと作り直され、クライアント側では変更しない。
/// 任意フィールドは欠損を `None` のまま保持する（0や空文字に置き換えない）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,

    pub city: Option<String>,
    pub category: Option<String>,

    pub sector_density_score: Option<f64>,
    pub sector_density_neighbors: Option<i64>,
    pub geo_distribution_label: Option<String>,
    pub geo_distribution_source: Option<String>,

    pub size_class: Option<String>,     // micro / piccola / media / grande
    pub is_chain: Option<bool>,
    pub ad_budget_band: Option<String>, // basso / medio / alto

    pub umbrella_affinity: Option<f64>,
    pub digital_presence: Option<f64>,
    pub digital_presence_confidence: Option<f64>,
    pub marketing_attitude: Option<f64>,
    pub facts_confidence: Option<f64>,
    pub facts_confidence_override: Option<f64>,
    pub metrics_updated_at: Option<String>,

    pub website_url: Option<String>,
    pub social: Option<BTreeMap<String, String>>,
    pub facts_marketing_attitude: Option<f64>,
    pub facts_umbrella_affinity: Option<f64>,
    pub budget_source: Option<String>,
    pub provenance: Option<Value>,
    pub notes: Option<String>,
    pub facts_updated_at: Option<String>,
    pub source_provider: Option<String>,
    pub source_model: Option<String>,

    /// モデルの生レスポンス（形式不定）
    pub llm_raw_response: Option<Value>,
}

/// チェーン店フィルタ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFilter {
    #[default]
    Any,
    Yes,
    No,
}

impl std::str::FromStr for ChainFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" | "" => Ok(ChainFilter::Any),
            "yes" | "true" | "chain" => Ok(ChainFilter::Yes),
            "no" | "false" | "independent" => Ok(ChainFilter::No),
            _ => Err(format!("Unknown chain filter: {}. Use any, yes, or no", s)),
        }
    }
}

/// 検索条件
///
/// しきい値は 0〜100 のパーセント値で保持する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub city: String,
    pub category: String,
    pub geo_label: String,
    pub size_class: String,
    pub ad_budget: String,
    pub is_chain: ChainFilter,
    pub min_affinity: u32,
    pub min_density: u32,
    pub min_digital: u32,
    pub limit: u32,
}

impl FilterState {
    pub const DEFAULT_LIMIT: u32 = 50;
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            city: String::new(),
            category: String::new(),
            geo_label: String::new(),
            size_class: String::new(),
            ad_budget: String::new(),
            is_chain: ChainFilter::Any,
            min_affinity: 0,
            min_density: 0,
            min_digital: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// 並び順の向き
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// 並び順。`None` で保持する場合はサーバーの順序を維持する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

/// ジョブの状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Ok,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Ok => "ok",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ジョブスロット1つ分の状態
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,

    #[serde(default)]
    pub started_at: Option<String>,

    #[serde(default)]
    pub ended_at: Option<String>,

    #[serde(default, rename = "last_rc")]
    pub last_exit_code: Option<i32>,

    #[serde(default, rename = "last_lines")]
    pub last_output_lines: Option<Vec<String>>,
}

impl JobState {
    /// 出力行（未取得なら空）
    pub fn lines(&self) -> &[String] {
        self.last_output_lines.as_deref().unwrap_or(&[])
    }
}

/// `/etl/status` のスナップショット（スロット名 → 状態）
///
/// ポーリングのたびに丸ごと置き換える。フィールド単位のマージはしない。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EtlStatus(pub BTreeMap<String, JobState>);

impl EtlStatus {
    pub fn get(&self, slot: JobSlot) -> Option<&JobState> {
        self.0.get(slot.as_key())
    }

    pub fn any_running(&self) -> bool {
        self.0.values().any(|job| job.status == JobStatus::Running)
    }

    pub fn any_ok(&self) -> bool {
        self.0.values().any(|job| job.status == JobStatus::Ok)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobState)> {
        self.0.iter().map(|(name, job)| (name.as_str(), job))
    }
}

/// 既知のジョブスロット
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobSlot {
    GoogleImport,
    Pipeline,
    AutoRefresh,
}

impl JobSlot {
    pub const ALL: [JobSlot; 3] = [JobSlot::GoogleImport, JobSlot::Pipeline, JobSlot::AutoRefresh];

    /// `/etl/status` のキー
    pub fn as_key(&self) -> &'static str {
        match self {
            JobSlot::GoogleImport => "google_import",
            JobSlot::Pipeline => "pipeline",
            JobSlot::AutoRefresh => "auto_refresh",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobSlot::GoogleImport => "Google Places",
            JobSlot::Pipeline => "Pipeline",
            JobSlot::AutoRefresh => "Auto Refresh",
        }
    }

    /// 起動エンドポイントのパス
    pub fn start_path(&self) -> &'static str {
        match self {
            JobSlot::GoogleImport => "/etl/google_places/start",
            JobSlot::Pipeline => "/etl/pipeline/start",
            JobSlot::AutoRefresh => "/automation/auto_refresh/start",
        }
    }

    /// 起動時にパラメータを送るスロットか
    pub fn takes_params(&self) -> bool {
        matches!(self, JobSlot::GoogleImport)
    }
}

impl std::str::FromStr for JobSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "google_import" | "google_places" | "import" => Ok(JobSlot::GoogleImport),
            "pipeline" => Ok(JobSlot::Pipeline),
            "auto_refresh" | "refresh" => Ok(JobSlot::AutoRefresh),
            _ => Err(format!(
                "Unknown job: {}. Use google-import, pipeline, or auto-refresh",
                s
            )),
        }
    }
}

impl std::fmt::Display for JobSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// テーブル件数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
    #[serde(rename = "tbl")]
    pub table: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_deserialize_nulls_stay_missing() {
        let json = r#"{
            "place_id": "p1",
            "name": "Bar Roma",
            "city": null,
            "sector_density_score": 0.8,
            "umbrella_affinity": null,
            "is_chain": false
        }"#;

        let place: Place = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(place.place_id, "p1");
        assert_eq!(place.city, None);
        assert_eq!(place.sector_density_score, Some(0.8));
        assert_eq!(place.umbrella_affinity, None);
        assert_eq!(place.digital_presence, None);
        assert_eq!(place.is_chain, Some(false));
        assert!(place.llm_raw_response.is_none());
    }

    #[test]
    fn test_place_requires_name() {
        let result = serde_json::from_str::<Place>(r#"{"place_id": "p1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_state_default() {
        let filters = FilterState::default();
        assert_eq!(filters.limit, 50);
        assert_eq!(filters.is_chain, ChainFilter::Any);
        assert!(filters.city.is_empty());
    }

    #[test]
    fn test_job_state_wire_names() {
        let json = r#"{
            "google_import": {"status": "running", "started_at": "2025-03-01T10:00:00", "ended_at": null, "last_rc": null, "last_lines": ["fetching..."]},
            "pipeline": {"status": "error", "last_rc": 2, "last_lines": null}
        }"#;

        let status: EtlStatus = serde_json::from_str(json).expect("デシリアライズ失敗");
        let import = status.get(JobSlot::GoogleImport).expect("google_import");
        assert_eq!(import.status, JobStatus::Running);
        assert_eq!(import.lines(), ["fetching...".to_string()]);

        let pipeline = status.get(JobSlot::Pipeline).expect("pipeline");
        assert_eq!(pipeline.last_exit_code, Some(2));
        assert!(pipeline.lines().is_empty());

        assert!(status.get(JobSlot::AutoRefresh).is_none());
        assert!(status.any_running());
        assert!(!status.any_ok());
    }

    #[test]
    fn test_job_slot_from_str() {
        assert_eq!("google-import".parse::<JobSlot>(), Ok(JobSlot::GoogleImport));
        assert_eq!("auto_refresh".parse::<JobSlot>(), Ok(JobSlot::AutoRefresh));
        assert_eq!("Pipeline".parse::<JobSlot>(), Ok(JobSlot::Pipeline));
        assert!("overpass".parse::<JobSlot>().is_err());
    }

    #[test]
    fn test_count_row_wire_name() {
        let rows: Vec<CountRow> =
            serde_json::from_str(r#"[{"tbl": "places_raw", "count": 12}]"#).unwrap();
        assert_eq!(rows[0].table, "places_raw");
        assert_eq!(rows[0].count, 12);
    }

    #[test]
    fn test_sort_direction_flip() {
        assert_eq!(SortDirection::Asc.flip(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.flip(), SortDirection::Asc);
    }
}
