use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaceViewError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("HTTP通信エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("リクエストが拒否されました (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("サーバーに接続できません: {0}")]
    Unavailable(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("ジョブ監視は終了しています")]
    MonitorClosed,

    #[error(transparent)]
    Common(#[from] place_view_common::Error),
}

pub type Result<T> = std::result::Result<T, PlaceViewError>;
