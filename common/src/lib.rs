//! Place View Common Library
//!
//! 検索・ジョブ監視クライアントが使う型と純粋ロジック（通信なし）

pub mod types;
pub mod scale;
pub mod error;
pub mod query;
pub mod ranking;
pub mod payload;
pub mod details;
pub mod import;

pub use types::{
    ChainFilter, CountRow, EtlStatus, FilterState, JobSlot, JobState, JobStatus, Place,
    SortDirection, SortState,
};
pub use scale::{fraction_to_percent, percent_to_fraction, PERCENT_SCALE};
pub use error::{Error, Result};
pub use query::compile_query;
pub use ranking::{
    apply_sort, compare, rank, toggle_sort, ColumnKind, ColumnSpec, SortColumn, SortValue, COLUMNS,
};
pub use payload::{decode_payload, decode_payload_str, decode_report, extract_json, Decoded, Strategy};
pub use details::{ai_flags, effective_confidence, humanize_label, AiFlags, Provenance};
pub use import::{ImportForm, ImportRequest};
