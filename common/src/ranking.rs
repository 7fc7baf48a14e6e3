//! 一覧の並べ替え
//!
//! 列ごとの設定（表示名・比較種別・既定の向き・値の取り出し）を
//! `COLUMNS` テーブルにまとめ、比較ロジックは1か所だけに置く。
//!
//! 欠損値の扱い:
//! - 文字列は trim + 小文字化して空なら欠損、数値は NaN も欠損
//! - 片方だけ欠損なら、向きに関係なく欠損側を後ろへ
//! - 両方欠損なら等しい

use crate::types::{Place, SortDirection, SortState};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 並べ替え可能な列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Name,
    City,
    Category,
    UmbrellaAffinity,
    DigitalPresence,
    SectorDensityScore,
}

/// 比較の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// 文字列・カテゴリ（既定は昇順）
    Text,
    /// スコア（既定は降順）
    Score,
}

/// 比較対象の値
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortValue<'a> {
    Text(Option<&'a str>),
    Number(Option<f64>),
}

/// 列の定義
#[derive(Clone, Copy)]
pub struct ColumnSpec {
    pub column: SortColumn,
    /// クエリ・CLIで使うキー
    pub key: &'static str,
    /// 見出し
    pub label: &'static str,
    pub kind: ColumnKind,
    pub default_direction: SortDirection,
    accessor: for<'a> fn(&'a Place) -> SortValue<'a>,
}

impl ColumnSpec {
    pub fn value<'a>(&self, place: &'a Place) -> SortValue<'a> {
        (self.accessor)(place)
    }
}

impl std::fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("column", &self.column)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("default_direction", &self.default_direction)
            .finish()
    }
}

fn name_value(p: &Place) -> SortValue<'_> {
    SortValue::Text(Some(p.name.as_str()))
}

fn city_value(p: &Place) -> SortValue<'_> {
    SortValue::Text(p.city.as_deref())
}

fn category_value(p: &Place) -> SortValue<'_> {
    SortValue::Text(p.category.as_deref())
}

fn affinity_value(p: &Place) -> SortValue<'_> {
    SortValue::Number(p.umbrella_affinity)
}

fn digital_value(p: &Place) -> SortValue<'_> {
    SortValue::Number(p.digital_presence)
}

fn density_value(p: &Place) -> SortValue<'_> {
    SortValue::Number(p.sector_density_score)
}

/// 列定義テーブル（表示順）
pub static COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec {
        column: SortColumn::Name,
        key: "name",
        label: "Nome",
        kind: ColumnKind::Text,
        default_direction: SortDirection::Asc,
        accessor: name_value,
    },
    ColumnSpec {
        column: SortColumn::City,
        key: "city",
        label: "Citta",
        kind: ColumnKind::Text,
        default_direction: SortDirection::Asc,
        accessor: city_value,
    },
    ColumnSpec {
        column: SortColumn::Category,
        key: "category",
        label: "Categoria",
        kind: ColumnKind::Text,
        default_direction: SortDirection::Asc,
        accessor: category_value,
    },
    ColumnSpec {
        column: SortColumn::UmbrellaAffinity,
        key: "umbrella_affinity",
        label: "Affinita",
        kind: ColumnKind::Score,
        default_direction: SortDirection::Desc,
        accessor: affinity_value,
    },
    ColumnSpec {
        column: SortColumn::DigitalPresence,
        key: "digital_presence",
        label: "Digitale",
        kind: ColumnKind::Score,
        default_direction: SortDirection::Desc,
        accessor: digital_value,
    },
    ColumnSpec {
        column: SortColumn::SectorDensityScore,
        key: "sector_density_score",
        label: "Densita",
        kind: ColumnKind::Score,
        default_direction: SortDirection::Desc,
        accessor: density_value,
    },
];

impl SortColumn {
    pub fn spec(&self) -> &'static ColumnSpec {
        match self {
            SortColumn::Name => &COLUMNS[0],
            SortColumn::City => &COLUMNS[1],
            SortColumn::Category => &COLUMNS[2],
            SortColumn::UmbrellaAffinity => &COLUMNS[3],
            SortColumn::DigitalPresence => &COLUMNS[4],
            SortColumn::SectorDensityScore => &COLUMNS[5],
        }
    }

    pub fn default_direction(&self) -> SortDirection {
        self.spec().default_direction
    }
}

impl std::str::FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        if let Some(spec) = COLUMNS.iter().find(|c| c.key == key) {
            return Ok(spec.column);
        }
        match key.as_str() {
            "affinity" => Ok(SortColumn::UmbrellaAffinity),
            "digital" => Ok(SortColumn::DigitalPresence),
            "density" => Ok(SortColumn::SectorDensityScore),
            _ => Err(format!(
                "Unknown sort column: {}. Use one of: {}",
                s,
                COLUMNS.iter().map(|c| c.key).collect::<Vec<_>>().join(", ")
            )),
        }
    }
}

impl std::fmt::Display for SortColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.spec().key)
    }
}

/// 欠損判定を先に行い、両方ある場合だけ `present` で比較して向きを適用
fn compare_present<T>(
    a: Option<T>,
    b: Option<T>,
    direction: SortDirection,
    present: impl FnOnce(T, T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = present(a, b);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// 照合キー: 分解してアクセント記号を落とした小文字列
fn collation_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn normalize_text(value: Option<&str>) -> Option<String> {
    let v = value?.trim().to_lowercase();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

fn compare_text(a: Option<&str>, b: Option<&str>, direction: SortDirection) -> Ordering {
    compare_present(normalize_text(a), normalize_text(b), direction, |a, b| {
        collation_key(&a)
            .cmp(&collation_key(&b))
            .then_with(|| a.cmp(&b))
    })
}

fn compare_numbers(a: Option<f64>, b: Option<f64>, direction: SortDirection) -> Ordering {
    let a = a.filter(|v| !v.is_nan());
    let b = b.filter(|v| !v.is_nan());
    compare_present(a, b, direction, |a, b| a.partial_cmp(&b).unwrap_or(Ordering::Equal))
}

/// 2件のレコードを指定列・向きで比較
pub fn compare(a: &Place, b: &Place, column: SortColumn, direction: SortDirection) -> Ordering {
    let spec = column.spec();
    match (spec.value(a), spec.value(b)) {
        (SortValue::Text(a), SortValue::Text(b)) => compare_text(a, b, direction),
        (SortValue::Number(a), SortValue::Number(b)) => compare_numbers(a, b, direction),
        _ => Ordering::Equal,
    }
}

/// 安定ソートで並べ替えた参照列を返す（同順位は元の順序を維持）
pub fn rank<'a>(places: &'a [Place], column: SortColumn, direction: SortDirection) -> Vec<&'a Place> {
    let mut ordered: Vec<&Place> = places.iter().collect();
    ordered.sort_by(|a, b| compare(a, b, column, direction));
    ordered
}

/// 並び順が未指定ならサーバーの順序のまま返す
pub fn apply_sort(places: &[Place], sort: Option<SortState>) -> Vec<&Place> {
    match sort {
        Some(s) => rank(places, s.column, s.direction),
        None => places.iter().collect(),
    }
}

/// 列見出しのクリック
///
/// 別の列なら列の既定の向き、同じ列なら向きを反転する。
pub fn toggle_sort(current: Option<SortState>, column: SortColumn) -> SortState {
    match current {
        Some(prev) if prev.column == column => SortState {
            column,
            direction: prev.direction.flip(),
        },
        _ => SortState {
            column,
            direction: column.default_direction(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, density: Option<f64>) -> Place {
        Place {
            place_id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            sector_density_score: density,
            ..Default::default()
        }
    }

    fn names(places: &[&Place]) -> Vec<String> {
        places.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_name_ascending() {
        let rows = vec![place("Bar Roma", Some(0.8)), place("Bar Alfa", None)];
        let sorted = rank(&rows, SortColumn::Name, SortDirection::Asc);
        assert_eq!(names(&sorted), ["Bar Alfa", "Bar Roma"]);
    }

    #[test]
    fn test_missing_score_last_both_directions() {
        let rows = vec![
            place("Bar Alfa", None),
            place("Bar Roma", Some(0.8)),
            place("Bar Beta", Some(0.2)),
        ];

        let desc = rank(&rows, SortColumn::SectorDensityScore, SortDirection::Desc);
        assert_eq!(names(&desc), ["Bar Roma", "Bar Beta", "Bar Alfa"]);

        let asc = rank(&rows, SortColumn::SectorDensityScore, SortDirection::Asc);
        assert_eq!(names(&asc), ["Bar Beta", "Bar Roma", "Bar Alfa"]);
    }

    #[test]
    fn test_nan_is_missing() {
        let rows = vec![place("Nan", Some(f64::NAN)), place("Zero", Some(0.0))];
        let asc = rank(&rows, SortColumn::SectorDensityScore, SortDirection::Asc);
        assert_eq!(names(&asc), ["Zero", "Nan"]);
    }

    #[test]
    fn test_blank_text_is_missing() {
        let mut a = place("A", None);
        a.city = Some("   ".into());
        let mut b = place("B", None);
        b.city = Some("Alatri".into());
        let c = place("C", None);

        let rows = vec![a, c, b];
        for dir in [SortDirection::Asc, SortDirection::Desc] {
            let sorted = rank(&rows, SortColumn::City, dir);
            assert_eq!(sorted[0].name, "B");
            // 欠損同士は元の順序
            assert_eq!(names(&sorted[1..]), ["A", "C"]);
        }
    }

    #[test]
    fn test_text_case_and_whitespace_insensitive() {
        let a = place("  bar roma ", None);
        let b = place("BAR ROMA", None);
        assert_eq!(compare(&a, &b, SortColumn::Name, SortDirection::Asc), Ordering::Equal);
    }

    #[test]
    fn test_accents_collate_near_base_letter() {
        let rows = vec![place("Zeta", None), place("Èrba", None), place("Ape", None)];
        let sorted = rank(&rows, SortColumn::Name, SortDirection::Asc);
        assert_eq!(names(&sorted), ["Ape", "Èrba", "Zeta"]);
    }

    #[test]
    fn test_antisymmetric() {
        let rows = vec![
            place("Bar Roma", Some(0.8)),
            place("Bar Alfa", None),
            place("bar alfa", Some(0.8)),
            place("", Some(f64::NAN)),
        ];
        for spec in COLUMNS.iter() {
            for dir in [SortDirection::Asc, SortDirection::Desc] {
                for a in &rows {
                    for b in &rows {
                        assert_eq!(
                            compare(a, b, spec.column, dir),
                            compare(b, a, spec.column, dir).reverse(),
                            "column {:?} {:?}",
                            spec.column,
                            dir
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_stable_and_idempotent() {
        let rows = vec![
            place("First", Some(0.5)),
            place("Second", Some(0.9)),
            place("Third", Some(0.5)),
            place("Fourth", None),
        ];
        let once = rank(&rows, SortColumn::SectorDensityScore, SortDirection::Desc);
        assert_eq!(names(&once), ["Second", "First", "Third", "Fourth"]);

        let owned: Vec<Place> = once.iter().map(|p| (*p).clone()).collect();
        let twice = rank(&owned, SortColumn::SectorDensityScore, SortDirection::Desc);
        assert_eq!(names(&once), names(&twice));
    }

    #[test]
    fn test_apply_sort_none_keeps_server_order() {
        let rows = vec![place("Zeta", None), place("Alfa", None)];
        assert_eq!(names(&apply_sort(&rows, None)), ["Zeta", "Alfa"]);
    }

    #[test]
    fn test_toggle_sort() {
        let s = toggle_sort(None, SortColumn::Name);
        assert_eq!(s.direction, SortDirection::Asc);

        let s = toggle_sort(Some(s), SortColumn::Name);
        assert_eq!(s.direction, SortDirection::Desc);

        let s = toggle_sort(Some(s), SortColumn::DigitalPresence);
        assert_eq!(s.column, SortColumn::DigitalPresence);
        assert_eq!(s.direction, SortDirection::Desc);

        let s = toggle_sort(Some(s), SortColumn::DigitalPresence);
        assert_eq!(s.direction, SortDirection::Asc);
    }

    #[test]
    fn test_column_table_consistent() {
        for spec in COLUMNS.iter() {
            assert_eq!(spec.column.spec().key, spec.key);
            let expected = match spec.kind {
                ColumnKind::Text => SortDirection::Asc,
                ColumnKind::Score => SortDirection::Desc,
            };
            assert_eq!(spec.default_direction, expected);
        }
    }

    #[test]
    fn test_sort_column_from_str() {
        assert_eq!("density".parse::<SortColumn>(), Ok(SortColumn::SectorDensityScore));
        assert_eq!("umbrella-affinity".parse::<SortColumn>(), Ok(SortColumn::UmbrellaAffinity));
        assert_eq!("Name".parse::<SortColumn>(), Ok(SortColumn::Name));
        assert!("rating".parse::<SortColumn>().is_err());
    }
}
