//! モデル生レスポンスのデコーダ
//!
//! `llm_raw_response` は形式が決まっていない:
//! - 構造化データそのもの
//! - JSON文字列 / ```json フェンス付きの文字列
//! - JSON文字列をさらに文字列化したもの（二重エンコード）
//! - `\n` や `\"` がエスケープされたままの文字列
//!
//! 名前付きの戦略を順に試し、最初に成功したものを採用する。
//! どれも失敗した場合はエスケープを戻しただけのテキストを返す。
//! パニックもエラーも返さない。

use crate::error::{Error, Result};
use serde_json::Value;

/// デコード戦略（試行順）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// そのままパース
    Direct,
    /// 外側の引用符を1組だけ外してパース
    Unquoted,
    /// バックスラッシュエスケープを戻してパース
    Unescaped,
    /// 説明文の中の ```json ブロックをパース
    Embedded,
}

impl Strategy {
    pub const PIPELINE: [Strategy; 4] = [
        Strategy::Direct,
        Strategy::Unquoted,
        Strategy::Unescaped,
        Strategy::Embedded,
    ];

    fn attempt(self, text: &str) -> Option<String> {
        match self {
            Strategy::Direct => try_parse(text),
            Strategy::Unquoted => strip_quotes(text).and_then(try_parse),
            Strategy::Unescaped => {
                let decoded = unescape(text)?;
                if decoded == text {
                    return None;
                }
                try_parse(strip_fence(&decoded))
            }
            Strategy::Embedded => extract_json(text).ok().and_then(try_parse),
        }
    }
}

/// デコード結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// 表示用テキスト
    pub text: String,
    /// 成功した戦略（`None` はプレーンテキストとして返したもの）
    pub strategy: Option<Strategy>,
}

/// 任意のJSON値を表示用文字列に変換
///
/// 欠損・null・空文字のときだけ `None` を返す。
pub fn decode_payload(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::Null => None,
        Value::String(s) => decode_payload_str(s),
        other => Some(serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())),
    }
}

/// 文字列の生レスポンスを表示用文字列に変換
///
/// # Examples
/// ```
/// use place_view_common::decode_payload_str;
///
/// let pretty = decode_payload_str("```json\n{\"k\":\"v\"}\n```").unwrap();
/// assert_eq!(pretty, "{\n  \"k\": \"v\"\n}");
/// ```
pub fn decode_payload_str(raw: &str) -> Option<String> {
    decode_report(raw).map(|d| d.text)
}

/// どの戦略で復元できたかも含めて返す
pub fn decode_report(raw: &str) -> Option<Decoded> {
    let cleaned = strip_fence(raw);
    if cleaned.is_empty() {
        return None;
    }

    for strategy in Strategy::PIPELINE {
        if let Some(text) = strategy.attempt(cleaned) {
            return Some(Decoded {
                text,
                strategy: Some(strategy),
            });
        }
    }

    Some(Decoded {
        text: unescape(cleaned).unwrap_or_else(|| cleaned.to_string()),
        strategy: None,
    })
}

/// 前後のコードフェンス（```、```json）を除去
fn strip_fence(input: &str) -> &str {
    let mut out = input.trim();
    if let Some(rest) = out.strip_prefix("```") {
        out = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        }
        .trim();
        if let Some(body) = out.strip_suffix("```") {
            out = body.trim();
        }
    }
    out
}

/// 同じ引用符で囲まれていれば1層だけ外す
fn strip_quotes(input: &str) -> Option<&str> {
    let bytes = input.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
    if first == last && (first == b'"' || first == b'\'') {
        Some(&input[1..input.len() - 1])
    } else {
        None
    }
}

/// パースして整形。文字列が出てきたら中身をもう一度パースする
fn try_parse(input: &str) -> Option<String> {
    match serde_json::from_str::<Value>(input.trim()).ok()? {
        Value::String(inner) => Some(try_parse(strip_fence(&inner)).unwrap_or(inner)),
        value => serde_json::to_string_pretty(&value).ok(),
    }
}

/// 文字列全体を引用符付きリテラルの中身とみなしてエスケープを戻す
///
/// 既存の `\n` `\"` `\uXXXX` は解釈し、生の改行や裸の `"` はそのまま残す。
/// 不正なエスケープを含む場合は `None`。
fn unescape(input: &str) -> Option<String> {
    let mut literal = String::with_capacity(input.len() + 2);
    literal.push('"');
    let mut escaped = false;
    for c in input.chars() {
        if escaped {
            literal.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                literal.push(c);
                escaped = true;
            }
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if c.is_control() => literal.push_str(&format!("\\u{:04x}", c as u32)),
            c => literal.push(c),
        }
    }
    if escaped {
        // 末尾の単独バックスラッシュは文字として残す
        literal.push('\\');
    }
    literal.push('"');

    serde_json::from_str::<String>(&literal).ok()
}

/// 説明文の中から ```json ... ``` ブロックを抽出
///
/// # Returns
/// * `Ok(&str)` - ブロックの中身（前後の空白は除去）
/// * `Err` - ブロックが見つからない場合
pub fn extract_json(response: &str) -> Result<&str> {
    let lower = response.to_ascii_lowercase();
    if let Some(start_marker) = lower.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    Err(Error::Parse("JSONブロックが見つかりません".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(text: &str) -> Value {
        serde_json::from_str(text).expect("整形結果がJSONではない")
    }

    // =============================================
    // decode_payload（非文字列）
    // =============================================

    #[test]
    fn test_absent_and_null() {
        assert_eq!(decode_payload(None), None);
        assert_eq!(decode_payload(Some(&Value::Null)), None);
    }

    #[test]
    fn test_native_value_pretty() {
        let value = json!({"size_class": "micro", "is_chain": false});
        let text = decode_payload(Some(&value)).unwrap();
        assert!(text.contains("\n  \"is_chain\": false"));
        assert_eq!(parsed(&text), value);
    }

    #[test]
    fn test_native_number() {
        assert_eq!(decode_payload(Some(&json!(42))).as_deref(), Some("42"));
    }

    // =============================================
    // decode_payload_str
    // =============================================

    #[test]
    fn test_fenced_json() {
        let text = decode_payload_str("```json\n{\"k\":\"v\"}\n```").unwrap();
        assert_eq!(text, "{\n  \"k\": \"v\"\n}");
    }

    #[test]
    fn test_fence_tag_case_and_untagged() {
        let upper = decode_payload_str("```JSON\n[1,2]\n```").unwrap();
        let bare = decode_payload_str("```\n[1,2]\n```").unwrap();
        assert_eq!(upper, bare);
        assert_eq!(parsed(&bare), json!([1, 2]));
    }

    #[test]
    fn test_plain_json_reformatted() {
        let report = decode_report(r#"{"a":1,"b":[true,null]}"#).unwrap();
        assert_eq!(report.strategy, Some(Strategy::Direct));
        assert_eq!(parsed(&report.text), json!({"a": 1, "b": [true, null]}));
    }

    #[test]
    fn test_idempotent_on_clean_input() {
        let once = decode_payload_str(r#"{"a":{"b":2}}"#).unwrap();
        let twice = decode_payload_str(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_double_encoded_matches_direct() {
        let direct = decode_payload_str(r#"{"a":1}"#).unwrap();
        let quoted = decode_payload_str(r#""{\"a\":1}""#).unwrap();
        assert_eq!(direct, quoted);
    }

    #[test]
    fn test_double_encoded_fenced() {
        let raw = serde_json::to_string("```json\n{\"k\": 1}\n```").unwrap();
        let text = decode_payload_str(&raw).unwrap();
        assert_eq!(parsed(&text), json!({"k": 1}));
    }

    #[test]
    fn test_json_string_of_prose_returns_inner_text() {
        let text = decode_payload_str(r#""just a sentence""#).unwrap();
        assert_eq!(text, "just a sentence");
    }

    #[test]
    fn test_single_quoted_wrapper() {
        let report = decode_report(r#"'{"a": [1, 2]}'"#).unwrap();
        assert_eq!(report.strategy, Some(Strategy::Unquoted));
        assert_eq!(parsed(&report.text), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_escaped_payload() {
        let raw = r#"{\"score\": 0.7,\n \"reasoning\": \"bar in centro\"}"#;
        let report = decode_report(raw).unwrap();
        assert_eq!(report.strategy, Some(Strategy::Unescaped));
        assert_eq!(parsed(&report.text), json!({"score": 0.7, "reasoning": "bar in centro"}));
    }

    #[test]
    fn test_escaped_fence_inside() {
        let raw = r#"```json\n{\"k\": \"v\"}\n```"#;
        let text = decode_payload_str(raw).unwrap();
        assert_eq!(parsed(&text), json!({"k": "v"}));
    }

    #[test]
    fn test_embedded_block_in_prose() {
        let raw = "Ecco la risposta:\n```json\n{\"size_class\": \"media\"}\n```\nFine.";
        let report = decode_report(raw).unwrap();
        assert_eq!(report.strategy, Some(Strategy::Embedded));
        assert_eq!(parsed(&report.text), json!({"size_class": "media"}));
    }

    #[test]
    fn test_prose_returned_verbatim() {
        let raw = "The business looks independent, budget probably low.";
        let report = decode_report(raw).unwrap();
        assert_eq!(report.strategy, None);
        assert_eq!(report.text, raw);
    }

    #[test]
    fn test_prose_with_escapes_is_unescaped() {
        let text = decode_payload_str(r"line one\nline two").unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_empty_after_fence() {
        assert_eq!(decode_payload_str(""), None);
        assert_eq!(decode_payload_str("   \n "), None);
        assert_eq!(decode_payload_str("```json\n```"), None);
        assert_eq!(decode_payload(Some(&json!("  "))), None);
    }

    #[test]
    fn test_never_panics_on_odd_input() {
        let inputs = [
            "{",
            "}{",
            "\"",
            "'",
            "\\",
            "\\u12",
            "\"{\\\"a\\\":",
            "```",
            "```json",
            "[1, 2",
            "'mixed\"",
            "è\\q🙂",
            "\u{0}\u{1f}",
        ];
        for input in inputs {
            let out = decode_payload_str(input);
            if input.trim() != "```" && input.trim() != "```json" {
                assert!(out.is_some(), "input {:?}", input);
            }
        }
    }

    // =============================================
    // extract_json
    // =============================================

    #[test]
    fn test_extract_json_with_block() {
        let response = "Here is the analysis:\n```json\n[\n  {\"k\": \"v\"}\n]\n```\nSome additional text.";
        let json = extract_json(response).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"k\""));
    }

    #[test]
    fn test_extract_json_error() {
        let result = extract_json("No JSON here, just plain text.");
        match result {
            Err(Error::Parse(msg)) => assert!(msg.contains("JSONブロック")),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }
}
