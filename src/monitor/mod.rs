//! ETLジョブ監視モジュール
//!
//! ジョブスロット（import / pipeline / auto-refresh）の状態をまとめて取得し、
//! 実行中のジョブがある間だけ一定間隔でポーリングする。
//!
//! ## 状態の扱い
//! - スナップショットは毎回丸ごと置き換える（スロット単位のマージはしない）
//! - 取得に失敗したら状態は「不明」（`None`）にし、ポーリングも止める（自動リトライはしない）
//! - `ok` のジョブがあれば件数を1回だけ再取得する
//!
//! ## ポーリング
//! - タイマーは [`PollTimer`] が所有し、同時に1つしか存在しない
//! - 応答待ちのポーリングがある間は次のポーリングを発行しない
//!   （`poll` の future が途中で破棄された場合は応答待ちを解除する）
//! - `teardown` 後に届いた応答は反映しない（世代番号で判定）

mod timer;

pub use timer::PollTimer;

use crate::api::EtlApi;
use crate::error::{PlaceViewError, Result};
use place_view_common::{CountRow, EtlStatus, ImportForm, JobSlot};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// 既定のポーリング間隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// 発行済みポーリングの控え
#[derive(Debug)]
pub struct PollTicket {
    generation: u64,
}

/// ポーリング1回の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// スナップショットを反映した
    Applied {
        any_running: bool,
        /// `ok` のジョブがあり、件数の再取得が必要
        counts_due: bool,
    },
    /// 取得失敗。状態は不明になった
    Failed,
    /// 応答待ちのポーリングがある、または終了済みのため発行しなかった
    Skipped,
    /// `teardown` 前に発行された応答なので破棄した
    Stale,
}

/// 統計情報
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub polls_issued: u64,
    pub polls_skipped: u64,
    pub stale_discarded: u64,
    pub counts_refreshes: u64,
}

/// `poll` の応答待ちフラグ。future ごと破棄されても下ろす
struct InFlight<'a>(&'a mut bool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

pub struct JobMonitor<A> {
    api: A,
    status: Option<EtlStatus>,
    healthy: bool,
    counts: Option<Vec<CountRow>>,
    timer: PollTimer,
    generation: u64,
    in_flight: bool,
    closed: bool,
    stats: PollStats,
}

impl<A: EtlApi> JobMonitor<A> {
    pub fn new(api: A) -> Self {
        Self::with_interval(api, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(api: A, interval: Duration) -> Self {
        Self {
            api,
            status: None,
            healthy: false,
            counts: None,
            timer: PollTimer::new(interval),
            generation: 0,
            in_flight: false,
            closed: false,
            stats: PollStats::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// 最新のスナップショット（`None` は未取得または取得失敗）
    pub fn status(&self) -> Option<&EtlStatus> {
        self.status.as_ref()
    }

    pub fn healthy(&self) -> bool {
        self.healthy
    }

    pub fn counts(&self) -> Option<&[CountRow]> {
        self.counts.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_active()
    }

    pub fn timer(&self) -> &PollTimer {
        &self.timer
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 画面表示時の初期化: 疎通・件数・ジョブ状態を取得
    pub async fn mount(&mut self) -> PollOutcome {
        self.refresh_overview().await;
        self.poll().await
    }

    /// 疎通確認と件数を再取得（ポーリングとは独立）
    pub async fn refresh_overview(&mut self) {
        self.refresh_health().await;
        self.refresh_counts().await;
    }

    pub async fn refresh_health(&mut self) -> bool {
        self.healthy = self.api.health().await;
        self.healthy
    }

    pub async fn refresh_counts(&mut self) {
        self.counts = match self.api.counts().await {
            Ok(counts) => Some(counts),
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch counts");
                None
            }
        };
    }

    /// ジョブを起動し、状態を取り直してポーリングを開始
    ///
    /// 起動が拒否された場合はエラーを返し、ポーリング状態は変えない。
    /// ローカルで `running` にはしない（サーバーの状態を正とする）。
    pub async fn start(&mut self, slot: JobSlot, params: Option<Value>) -> Result<PollOutcome> {
        if self.closed {
            return Err(PlaceViewError::MonitorClosed);
        }

        if let Err(e) = self.api.start_job(slot, params).await {
            tracing::warn!(job = %slot, error = %e, "job start rejected");
            return Err(e);
        }
        tracing::info!(job = %slot, "job start accepted");

        self.start_polling();
        Ok(self.poll().await)
    }

    /// 取込ジョブを起動（送信前にフォームを検証）
    pub async fn start_import(&mut self, form: &ImportForm) -> Result<PollOutcome> {
        let request = form.validate()?;
        let body = serde_json::to_value(&request)?;
        self.start(JobSlot::GoogleImport, Some(body)).await
    }

    /// 状態を1回取得して反映
    pub async fn poll(&mut self) -> PollOutcome {
        let Some(ticket) = self.begin_poll() else {
            return PollOutcome::Skipped;
        };

        let result = {
            let _in_flight = InFlight(&mut self.in_flight);
            self.api.etl_status().await
        };
        let outcome = self.finish_poll(ticket, result);

        if let PollOutcome::Applied { counts_due: true, .. } = outcome {
            self.refresh_counts().await;
            self.stats.counts_refreshes += 1;
        }
        outcome
    }

    /// ポーリングの発行を登録
    ///
    /// 応答待ちがある、または終了済みなら `None`。
    pub fn begin_poll(&mut self) -> Option<PollTicket> {
        if self.closed || self.in_flight {
            self.stats.polls_skipped += 1;
            tracing::debug!(closed = self.closed, "poll skipped");
            return None;
        }
        self.in_flight = true;
        self.stats.polls_issued += 1;
        Some(PollTicket {
            generation: self.generation,
        })
    }

    /// 応答を反映
    ///
    /// スナップショットに実行中ジョブがあればタイマーを開始し、なければ停止する。
    /// 取得失敗時も停止する。
    /// 件数の再取得は `counts_due` で呼び出し側に知らせる。
    pub fn finish_poll(&mut self, ticket: PollTicket, result: Result<EtlStatus>) -> PollOutcome {
        if self.closed || ticket.generation != self.generation {
            self.stats.stale_discarded += 1;
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale poll response"
            );
            return PollOutcome::Stale;
        }
        self.in_flight = false;

        match result {
            Ok(snapshot) => {
                let any_running = snapshot.any_running();
                let counts_due = snapshot.any_ok();
                self.status = Some(snapshot);
                if any_running {
                    self.start_polling();
                } else {
                    self.stop_polling();
                }
                PollOutcome::Applied {
                    any_running,
                    counts_due,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch job status");
                self.status = None;
                self.stop_polling();
                PollOutcome::Failed
            }
        }
    }

    /// タイマー開始（動作中なら何もしない）
    pub fn start_polling(&mut self) {
        if self.closed {
            return;
        }
        if self.timer.start() {
            tracing::debug!(interval = ?self.timer.period(), "polling started");
        }
    }

    pub fn stop_polling(&mut self) {
        if self.timer.stop() {
            tracing::debug!("polling stopped");
        }
    }

    /// 次の tick まで待つ。停止中なら false
    pub async fn wait_tick(&mut self) -> bool {
        self.timer.tick().await
    }

    /// 実行中のジョブがなくなるまでポーリングを続ける
    ///
    /// `shutdown` が完了したら `teardown` して抜ける。応答待ちのポーリングは破棄する。
    /// 各ポーリング後に `on_update` を呼ぶ。
    pub async fn run_until_idle<F, C>(&mut self, shutdown: F, mut on_update: C)
    where
        F: Future<Output = ()>,
        C: FnMut(&Self, PollOutcome),
    {
        tokio::pin!(shutdown);

        while self.timer.is_active() {
            tokio::select! {
                _ = &mut shutdown => {
                    self.teardown();
                    return;
                }
                ticked = self.timer.tick() => {
                    if !ticked {
                        break;
                    }
                }
            }

            let outcome = tokio::select! {
                _ = &mut shutdown => {
                    self.teardown();
                    return;
                }
                outcome = self.poll() => outcome,
            };
            on_update(self, outcome);
        }
    }

    /// 監視を終了: タイマーを破棄し、発行済みの応答を無効にする
    pub fn teardown(&mut self) {
        self.stop_polling();
        self.generation += 1;
        self.in_flight = false;
        self.closed = true;
        tracing::debug!(generation = self.generation, "monitor torn down");
    }
}
