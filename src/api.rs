//! 分析サービスのHTTPクライアント
//!
//! - `GET /health`, `GET /counts`: 単発の状態確認
//! - `GET /places?...`: 検索
//! - `GET /etl/status`, `POST .../start`: ジョブ監視・起動

use crate::error::{PlaceViewError, Result};
use async_trait::async_trait;
use place_view_common::{compile_query, CountRow, EtlStatus, FilterState, JobSlot, Place};
use serde_json::Value;
use std::time::Duration;

/// ジョブ監視が使うリモート操作
#[async_trait]
pub trait EtlApi: Send + Sync {
    /// 応答が 2xx なら true（通信失敗も false）
    async fn health(&self) -> bool;

    async fn counts(&self) -> Result<Vec<CountRow>>;

    /// 全ジョブスロットのスナップショット
    async fn etl_status(&self) -> Result<EtlStatus>;

    /// ジョブ起動。拒否された場合はレスポンス本文をエラー詳細にする
    async fn start_job(&self, slot: JobSlot, body: Option<Value>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// 検索（サーバーの並び順のまま返す）
    pub async fn places(&self, filters: &FilterState) -> Result<Vec<Place>> {
        let url = format!("{}?{}", self.url("/places"), compile_query(filters));
        tracing::debug!(%url, "searching places");
        let resp = self.client.get(&url).send().await?;
        let places = resp.error_for_status()?.json::<Vec<Place>>().await?;
        Ok(places)
    }
}

#[async_trait]
impl EtlApi for ApiClient {
    async fn health(&self) -> bool {
        match self.client.get(self.url("/health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "health probe failed");
                false
            }
        }
    }

    async fn counts(&self) -> Result<Vec<CountRow>> {
        let resp = self.client.get(self.url("/counts")).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    async fn etl_status(&self) -> Result<EtlStatus> {
        let resp = self.client.get(self.url("/etl/status")).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    async fn start_job(&self, slot: JobSlot, body: Option<Value>) -> Result<()> {
        let mut req = self.client.post(self.url(slot.start_path()));
        if let Some(body) = &body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(PlaceViewError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(())
    }
}
