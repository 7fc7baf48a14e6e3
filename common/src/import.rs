//! Google Places 取込ジョブの起動パラメータ
//!
//! 入力フォームの文字列をそのまま受け取り、送信前に検証する。
//! ここでの検証は事前チェックで、サーバー側がより厳しい場合もある。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 入力フォーム（未検証の文字列）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportForm {
    /// 検索語（改行・カンマ区切り）
    pub queries: String,
    pub location: String,
    pub lat: String,
    pub lng: String,
    pub radius: String,
    pub limit: String,
    pub sleep_seconds: String,
}

impl Default for ImportForm {
    fn default() -> Self {
        Self {
            queries: String::new(),
            location: String::new(),
            lat: String::new(),
            lng: String::new(),
            radius: String::new(),
            limit: String::new(),
            sleep_seconds: "2".to_string(),
        }
    }
}

/// 検証済みの起動リクエスト本文
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<String>>,
}

fn parse_number(field: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| Error::Validation(format!("{} is not a valid number: {}", field, value)))
}

/// 正の数を整数に丸める（空欄なら `None`）
fn parse_positive(field: &str, value: &str) -> Result<Option<u32>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let n = parse_number(field, value)?.round();
    if n < 1.0 {
        return Err(Error::Validation(format!("{} must be a positive integer", field)));
    }
    Ok(Some(n.min(u32::MAX as f64) as u32))
}

impl ImportForm {
    /// 検索語を分割（空要素は除く）
    pub fn query_list(&self) -> Vec<String> {
        self.queries
            .split(['\r', '\n', ','])
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(String::from)
            .collect()
    }

    /// フォームを検証してリクエスト本文を作る
    ///
    /// - lat/lng は両方指定するか両方空
    /// - location か lat/lng のどちらかが必須
    /// - radius / limit は正の数、sleep_seconds は 0 以上
    pub fn validate(&self) -> Result<ImportRequest> {
        let mut request = ImportRequest::default();

        let queries = self.query_list();
        if !queries.is_empty() {
            request.queries = Some(queries);
        }

        let location = self.location.trim();
        if !location.is_empty() {
            request.location = Some(location.to_string());
        }

        let (lat, lng) = (self.lat.trim(), self.lng.trim());
        if !lat.is_empty() || !lng.is_empty() {
            if lat.is_empty() || lng.is_empty() {
                return Err(Error::Validation(
                    "lat and lng must be given together or not at all".into(),
                ));
            }
            request.lat = Some(parse_number("lat", lat)?);
            request.lng = Some(parse_number("lng", lng)?);
        }

        if request.location.is_none() && request.lat.is_none() {
            return Err(Error::Validation(
                "either a location or a lat/lng pair is required".into(),
            ));
        }

        request.radius = parse_positive("radius", &self.radius)?;
        request.limit = parse_positive("limit", &self.limit)?;

        let sleep = self.sleep_seconds.trim();
        if !sleep.is_empty() {
            let n = parse_number("sleep_seconds", sleep)?;
            if n < 0.0 {
                return Err(Error::Validation(
                    "sleep_seconds must be greater than or equal to zero".into(),
                ));
            }
            request.sleep_seconds = Some(n);
        }

        Ok(request)
    }
}
