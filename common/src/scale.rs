//! パーセント⇔割合の変換
//!
//! クエリ側（0〜100 → "0.55"）と表示側（0.55 → 55%）で同じ係数を使う。

/// パーセント表記の係数
pub const PERCENT_SCALE: u32 = 100;

/// 0〜100 のパーセント値を小数2桁固定の割合文字列に変換
///
/// 浮動小数を経由しないので 55 は常に "0.55" になる。
/// 100 を超える値は 100 に丸める。
pub fn percent_to_fraction(percent: u32) -> String {
    let p = percent.min(PERCENT_SCALE);
    format!("{}.{:02}", p / PERCENT_SCALE, p % PERCENT_SCALE)
}

/// [0,1] の割合を表示用パーセントに変換（範囲外は切り詰め、NaN は欠損）
pub fn fraction_to_percent(value: Option<f64>) -> Option<u32> {
    let v = value.filter(|v| !v.is_nan())?;
    let clamped = v.clamp(0.0, 1.0);
    Some((clamped * PERCENT_SCALE as f64).round() as u32)
}
