//! place-view: 事業所メトリクス検索・ETLジョブ監視クライアント

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod monitor;
pub mod render;
