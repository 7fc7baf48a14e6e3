//! 検索クエリ生成
//!
//! FilterState から `/places?...` のクエリ文字列を組み立てる。
//! 空の条件はパラメータごと省略する（「空に絞り込む」ではなく「条件なし」）。

use crate::scale::percent_to_fraction;
use crate::types::{ChainFilter, FilterState};
use url::form_urlencoded;

/// FilterState をクエリ文字列に変換
///
/// パラメータ順は固定なので、同じ入力からは常に同じ文字列が得られる。
/// `limit` は必ず出力し、0 の場合は 50 を使う。
///
/// # Examples
/// ```
/// use place_view_common::{compile_query, FilterState};
///
/// let filters = FilterState { city: "Alatri".into(), min_affinity: 55, ..Default::default() };
/// assert_eq!(compile_query(&filters), "city=Alatri&min_affinity=0.55&limit=50");
/// ```
pub fn compile_query(filters: &FilterState) -> String {
    let mut q = form_urlencoded::Serializer::new(String::new());

    let text_params = [
        ("city", &filters.city),
        ("category", &filters.category),
        ("geo_label", &filters.geo_label),
        ("size_class", &filters.size_class),
        ("ad_budget", &filters.ad_budget),
    ];
    for (key, value) in text_params {
        let value = value.trim();
        if !value.is_empty() {
            q.append_pair(key, value);
        }
    }

    match filters.is_chain {
        ChainFilter::Any => {}
        ChainFilter::Yes => {
            q.append_pair("is_chain", "true");
        }
        ChainFilter::No => {
            q.append_pair("is_chain", "false");
        }
    }

    let thresholds = [
        ("min_affinity", filters.min_affinity),
        ("min_density", filters.min_density),
        ("min_digital", filters.min_digital),
    ];
    for (key, percent) in thresholds {
        if percent > 0 {
            q.append_pair(key, &percent_to_fraction(percent));
        }
    }

    let limit = if filters.limit == 0 {
        FilterState::DEFAULT_LIMIT
    } else {
        filters.limit
    };
    q.append_pair("limit", &limit.to_string());

    q.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_only_limit() {
        assert_eq!(compile_query(&FilterState::default()), "limit=50");
    }

    #[test]
    fn test_zero_limit_falls_back() {
        let filters = FilterState { limit: 0, ..Default::default() };
        assert_eq!(compile_query(&filters), "limit=50");
    }

    #[test]
    fn test_blank_fields_are_omitted() {
        let filters = FilterState {
            city: "   ".into(),
            category: "restaurant".into(),
            ..Default::default()
        };
        let q = compile_query(&filters);
        assert_eq!(q, "category=restaurant&limit=50");
        assert!(!q.contains("city"));
    }

    #[test]
    fn test_chain_filter_tokens() {
        let yes = FilterState { is_chain: ChainFilter::Yes, ..Default::default() };
        let no = FilterState { is_chain: ChainFilter::No, ..Default::default() };
        assert_eq!(compile_query(&yes), "is_chain=true&limit=50");
        assert_eq!(compile_query(&no), "is_chain=false&limit=50");
    }

    #[test]
    fn test_thresholds_as_fractions() {
        let filters = FilterState {
            min_affinity: 55,
            min_density: 5,
            min_digital: 100,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(
            compile_query(&filters),
            "min_affinity=0.55&min_density=0.05&min_digital=1.00&limit=20"
        );
    }

    #[test]
    fn test_full_filter_order_and_encoding() {
        let filters = FilterState {
            city: "Frosinone".into(),
            category: "bar & cafe".into(),
            geo_label: "vicino_brello".into(),
            size_class: "micro".into(),
            ad_budget: "alto".into(),
            is_chain: ChainFilter::No,
            min_affinity: 40,
            min_density: 0,
            min_digital: 10,
            limit: 100,
        };
        assert_eq!(
            compile_query(&filters),
            "city=Frosinone&category=bar+%26+cafe&geo_label=vicino_brello&size_class=micro\
             &ad_budget=alto&is_chain=false&min_affinity=0.40&min_digital=0.10&limit=100"
        );
    }

    #[test]
    fn test_deterministic() {
        let filters = FilterState {
            city: "Alatri".into(),
            min_density: 33,
            ..Default::default()
        };
        assert_eq!(compile_query(&filters), compile_query(&filters.clone()));
    }
}
