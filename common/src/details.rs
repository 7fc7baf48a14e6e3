//! 詳細表示用の派生値
//!
//! レコードから表示用の値を組み立てる（ラベル整形・provenance の分解・AI由来判定）。

use crate::types::Place;
use serde_json::{Map, Value};

/// 地理ラベルなどを表示用に整形
///
/// 欠損は `-`。
pub fn humanize_label(label: Option<&str>) -> String {
    let Some(label) = label.filter(|l| !l.is_empty()) else {
        return "-".to_string();
    };
    let normalized = label.replace('_', " ");
    let normalized = normalized.trim();
    match normalized.to_lowercase().as_str() {
        "vicino brello" => return "Vicino Brello".to_string(),
        "passaggio" => return "Passaggio".to_string(),
        "centro" => return "Centro storico".to_string(),
        _ => {}
    }
    let mut chars = normalized.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 表示に使う信頼度（上書き値 → 事実の信頼度 → デジタル信頼度）
pub fn effective_confidence(place: &Place) -> Option<f64> {
    place
        .facts_confidence_override
        .or(place.facts_confidence)
        .or(place.digital_presence_confidence)
}

/// provenance を reasoning とそれ以外に分けたもの
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    /// 空でない `reasoning` 文字列（trim済み）
    pub reasoning: Option<String>,
    /// 残りのエントリ（空なら `None`）
    pub rest: Option<Map<String, Value>>,
}

impl Provenance {
    /// オブジェクト以外の provenance は無視する
    pub fn split(provenance: Option<&Value>) -> Self {
        let Some(Value::Object(map)) = provenance else {
            return Self::default();
        };

        let mut reasoning = None;
        let mut rest = Map::new();
        for (key, value) in map {
            match value {
                Value::String(s) if key == "reasoning" && !s.trim().is_empty() => {
                    reasoning = Some(s.trim().to_string());
                }
                _ => {
                    rest.insert(key.clone(), value.clone());
                }
            }
        }

        Self {
            reasoning,
            rest: if rest.is_empty() { None } else { Some(rest) },
        }
    }

    /// 値に "llm" を含むキー（小文字）
    fn llm_keys(&self) -> Vec<String> {
        self.rest
            .iter()
            .flatten()
            .filter(|(_, v)| v.as_str().is_some_and(|s| s.to_lowercase().contains("llm")))
            .map(|(k, _)| k.to_lowercase())
            .collect()
    }
}

/// 各チップがAI推定かどうか
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AiFlags {
    pub size: bool,
    pub chain: bool,
    pub budget: bool,
    pub geo: bool,
}

/// provenance と budget_source から AI 由来のフィールドを判定
pub fn ai_flags(place: &Place) -> AiFlags {
    let mut hints = Provenance::split(place.provenance.as_ref()).llm_keys();
    if place
        .budget_source
        .as_deref()
        .is_some_and(|s| s.to_lowercase().contains("llm"))
    {
        hints.push("budget".to_string());
    }
    let has = |key: &str| hints.iter().any(|h| h == key);

    AiFlags {
        size: has("size_class_source") || has("size_class") || has("dimensione"),
        chain: has("is_chain_source") || has("is_chain"),
        budget: has("budget") || has("ad_budget_band"),
        geo: has("geo_distribution_source"),
    }
}
