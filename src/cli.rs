use clap::{Args, Parser, Subcommand};
use place_view_common::{
    toggle_sort, ChainFilter, FilterState, ImportForm, JobSlot, SortColumn, SortDirection,
    SortState,
};

#[derive(Parser)]
#[command(name = "place-view")]
#[command(about = "事業所メトリクス検索・ETLジョブ監視ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// APIベースURL（環境変数・設定ファイルより優先）
    #[arg(long, global = true)]
    pub api_base: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// APIの疎通確認
    Health,

    /// テーブル件数を表示
    Counts,

    /// 事業所を検索して一覧表示
    Search(SearchArgs),

    /// ジョブ状態を表示
    Status,

    /// ジョブを起動
    Start(StartArgs),

    /// 実行中のジョブが終わるまで状態を監視
    Watch,

    /// 設定を表示・変更
    Config {
        /// 現在の設定を表示
        #[arg(long)]
        show: bool,

        /// APIベースURLを設定
        #[arg(long)]
        set_api_base: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// 都市
    #[arg(long)]
    pub city: Option<String>,

    /// カテゴリ
    #[arg(long)]
    pub category: Option<String>,

    /// 地域分布ラベル
    #[arg(long)]
    pub geo: Option<String>,

    /// 規模 (micro/piccola/media/grande)
    #[arg(long)]
    pub size: Option<String>,

    /// 広告予算帯 (basso/medio/alto)
    #[arg(long)]
    pub budget: Option<String>,

    /// チェーン店 (any/yes/no)
    #[arg(long, default_value = "any")]
    pub chain: ChainFilter,

    /// 親和性の下限 (%)
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_affinity: u32,

    /// 業種密度の下限 (%)
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_density: u32,

    /// デジタル存在感の下限 (%)
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_digital: u32,

    /// 最大件数（デフォルト: 設定値）
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// 並び替え列（繰り返すと向きを反転）
    #[arg(short, long = "sort")]
    pub sort: Vec<SortColumn>,

    /// 降順を強制
    #[arg(long, conflicts_with = "asc")]
    pub desc: bool,

    /// 昇順を強制
    #[arg(long)]
    pub asc: bool,

    /// 各件の詳細も表示
    #[arg(short, long)]
    pub details: bool,
}

impl SearchArgs {
    pub fn filter_state(&self, default_limit: u32) -> FilterState {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        FilterState {
            city: text(&self.city),
            category: text(&self.category),
            geo_label: text(&self.geo),
            size_class: text(&self.size),
            ad_budget: text(&self.budget),
            is_chain: self.chain,
            min_affinity: self.min_affinity,
            min_density: self.min_density,
            min_digital: self.min_digital,
            limit: self.limit.unwrap_or(default_limit),
        }
    }

    /// `--sort` をヘッダクリックと同じ規則で畳み込む
    pub fn sort_state(&self) -> Option<SortState> {
        let mut state = self
            .sort
            .iter()
            .fold(None, |current, &column| Some(toggle_sort(current, column)))?;
        if self.desc {
            state.direction = SortDirection::Desc;
        } else if self.asc {
            state.direction = SortDirection::Asc;
        }
        Some(state)
    }
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// ジョブ (google-import/pipeline/auto-refresh)
    pub job: JobSlot,

    /// 検索語（複数指定可、カンマ区切り可）
    #[arg(short, long = "query")]
    pub queries: Vec<String>,

    /// 地名
    #[arg(long)]
    pub location: Option<String>,

    /// 緯度
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<String>,

    /// 経度
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<String>,

    /// 半径 (m)
    #[arg(long)]
    pub radius: Option<String>,

    /// 取得件数
    #[arg(long)]
    pub limit: Option<String>,

    /// リクエスト間隔（秒）
    #[arg(long, default_value = "2")]
    pub sleep: String,

    /// 起動後、終了まで監視
    #[arg(short, long)]
    pub watch: bool,
}

impl StartArgs {
    pub fn import_form(&self) -> ImportForm {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        ImportForm {
            queries: self.queries.join("\n"),
            location: text(&self.location),
            lat: text(&self.lat),
            lng: text(&self.lng),
            radius: text(&self.radius),
            limit: text(&self.limit),
            sleep_seconds: self.sleep.clone(),
        }
    }

    /// 取込以外のジョブに取込用オプションが付いているか
    pub fn has_import_options(&self) -> bool {
        !self.queries.is_empty()
            || self.location.is_some()
            || self.lat.is_some()
            || self.lng.is_some()
            || self.radius.is_some()
            || self.limit.is_some()
    }
}
