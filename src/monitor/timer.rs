//! ポーリング用タイマー
//!
//! インターバルは常に0個か1個。`start` は動作中なら何もしない。

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug)]
pub struct PollTimer {
    period: Duration,
    interval: Option<Interval>,
    started: u64,
}

impl PollTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
            started: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// タイマーを開始（新しく作った場合だけ true）
    ///
    /// tokio ランタイム内で呼ぶこと。最初の tick は1周期後。
    pub fn start(&mut self) -> bool {
        if self.interval.is_some() {
            return false;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        // 応答が遅れたら次の tick も後ろにずらす
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        self.started += 1;
        true
    }

    /// タイマーを破棄（動作中だった場合だけ true）
    pub fn stop(&mut self) -> bool {
        self.interval.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.interval.is_some()
    }

    /// 生きているインターバルの数（0 か 1）
    pub fn active_count(&self) -> usize {
        usize::from(self.interval.is_some())
    }

    /// これまでに作成したインターバルの数
    pub fn started_count(&self) -> u64 {
        self.started
    }

    /// 次の tick まで待つ。停止中なら即座に false
    pub async fn tick(&mut self) -> bool {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
                true
            }
            None => false,
        }
    }
}
