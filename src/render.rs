//! 端末表示用の整形
//!
//! すべて文字列を返すだけで、出力は呼び出し側（main）が行う。

use chrono::{DateTime, NaiveDateTime};
use place_view_common::{
    ai_flags, decode_payload, effective_confidence, fraction_to_percent, humanize_label,
    ColumnKind, CountRow, EtlStatus, JobSlot, JobState, Place, Provenance, SortDirection,
    SortState, COLUMNS,
};
use std::fmt::Write;

/// ジョブ出力の表示行数
const TAIL_LINES: usize = 5;

const NAME_WIDTH: usize = 28;
const TEXT_WIDTH: usize = 16;
const SCORE_WIDTH: usize = 10;
/// 密度列は "55% (12 vicini)" を含む
const DENSITY_WIDTH: usize = 16;

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn pad(s: &str, width: usize) -> String {
    let s = truncate(s, width);
    let fill = width.saturating_sub(s.chars().count());
    format!("{}{}", s, " ".repeat(fill))
}

pub fn format_health(healthy: bool) -> &'static str {
    if healthy {
        "● API online"
    } else {
        "○ API offline"
    }
}

/// 0〜1 のスコアを "55%" 形式に（欠損は "-"）
pub fn format_percent(value: Option<f64>) -> String {
    match fraction_to_percent(value) {
        Some(p) => format!("{}%", p),
        None => "-".to_string(),
    }
}

/// サーバーの日時文字列を "日/月/年 時:分" に整形
///
/// 解釈できない場合は元の文字列をそのまま返す。
pub fn format_timestamp(value: Option<&str>) -> String {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return "-".to_string();
    };
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"));
    match parsed {
        Ok(dt) => dt.format("%d/%m/%y %H:%M").to_string(),
        Err(_) => value.to_string(),
    }
}

pub fn format_counts(counts: Option<&[CountRow]>) -> String {
    let Some(counts) = counts else {
        return "件数: 取得できません".to_string();
    };
    let mut out = String::from("件数:\n");
    for row in counts {
        let _ = writeln!(out, "  {:<20} {:>8}", row.table, row.count);
    }
    out
}

/// 検索結果の一覧表
pub fn format_places_table(places: &[&Place], sort: Option<SortState>) -> String {
    let mut out = String::new();

    let header: Vec<String> = COLUMNS
        .iter()
        .map(|spec| {
            let indicator = match sort {
                Some(s) if s.column == spec.column => match s.direction {
                    SortDirection::Asc => " ▲",
                    SortDirection::Desc => " ▼",
                },
                _ => "",
            };
            let label = format!("{}{}", spec.label, indicator);
            match (spec.key, spec.kind) {
                ("name", _) => pad(&label, NAME_WIDTH),
                ("sector_density_score", _) => {
                    format!("{:>width$}", label, width = DENSITY_WIDTH)
                }
                (_, ColumnKind::Text) => pad(&label, TEXT_WIDTH),
                (_, ColumnKind::Score) => format!("{:>width$}", label, width = SCORE_WIDTH),
            }
        })
        .collect();
    let _ = writeln!(out, "{} Geo area", header.join(" "));

    for place in places {
        let density = match place.sector_density_neighbors {
            Some(n) => format!("{} ({} vicini)", format_percent(place.sector_density_score), n),
            None => format_percent(place.sector_density_score),
        };
        let _ = writeln!(
            out,
            "{} {} {} {:>sw$} {:>sw$} {:>dw$} {}",
            pad(&place.name, NAME_WIDTH),
            pad(place.city.as_deref().unwrap_or("-"), TEXT_WIDTH),
            pad(place.category.as_deref().unwrap_or("-"), TEXT_WIDTH),
            format_percent(place.umbrella_affinity),
            format_percent(place.digital_presence),
            truncate(&density, DENSITY_WIDTH),
            humanize_label(place.geo_distribution_label.as_deref()),
            sw = SCORE_WIDTH,
            dw = DENSITY_WIDTH,
        );
    }

    if places.is_empty() {
        out.push_str("  (該当なし)\n");
    }
    out
}

fn ai_mark(is_ai: bool) -> &'static str {
    if is_ai {
        " [AI]"
    } else {
        ""
    }
}

/// 1件分の詳細
pub fn format_place_details(place: &Place) -> String {
    let mut out = String::new();
    let flags = ai_flags(place);

    let _ = writeln!(out, "■ {} ({})", place.name, place.place_id);

    let mut chips = Vec::new();
    if let Some(size) = &place.size_class {
        chips.push(format!("Dimensione: {}{}", size, ai_mark(flags.size)));
    }
    if let Some(is_chain) = place.is_chain {
        let label = if is_chain { "Catena" } else { "Indipendente" };
        chips.push(format!("Formato: {}{}", label, ai_mark(flags.chain)));
    }
    if let Some(budget) = &place.ad_budget_band {
        chips.push(format!("Budget: {}{}", budget, ai_mark(flags.budget)));
    }
    if place.geo_distribution_label.is_some() {
        chips.push(format!(
            "Geo area: {}{}",
            humanize_label(place.geo_distribution_label.as_deref()),
            ai_mark(flags.geo)
        ));
    }
    if !chips.is_empty() {
        let _ = writeln!(out, "  {}", chips.join(" | "));
    }

    let entries = [
        ("Fonte budget", place.budget_source.clone().unwrap_or_else(|| "-".into())),
        ("Marketing (metriche)", format_percent(place.marketing_attitude)),
        ("Marketing (LLM)", format_percent(place.facts_marketing_attitude)),
        ("Affinita (LLM)", format_percent(place.facts_umbrella_affinity)),
        ("Presenza digitale", format_percent(place.digital_presence)),
        ("Confidenza digitale", format_percent(place.digital_presence_confidence)),
        ("Fonte geo", place.geo_distribution_source.clone().unwrap_or_else(|| "-".into())),
        ("Densita settore", format_percent(place.sector_density_score)),
        (
            "N. vicini",
            place
                .sector_density_neighbors
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".into()),
        ),
        ("Metriche aggiornate", format_timestamp(place.metrics_updated_at.as_deref())),
        ("Website", place.website_url.clone().unwrap_or_else(|| "-".into())),
        ("Confidenza LLM", format_percent(effective_confidence(place))),
        ("Fonte LLM", place.source_provider.clone().unwrap_or_else(|| "-".into())),
        ("Modello", place.source_model.clone().unwrap_or_else(|| "-".into())),
        ("Aggiornamento LLM", format_timestamp(place.facts_updated_at.as_deref())),
    ];
    for (label, value) in entries {
        let _ = writeln!(out, "  {:<22} {}", label, value);
    }

    if let Some(social) = place.social.as_ref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "  Social:");
        for (network, url) in social {
            let _ = writeln!(out, "    {:<12} {}", network, url);
        }
    }

    if let Some(notes) = place.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        let _ = writeln!(out, "  Note: {}", notes);
    }

    let provenance = Provenance::split(place.provenance.as_ref());
    if let Some(reasoning) = &provenance.reasoning {
        let _ = writeln!(out, "  Reasoning: {}", reasoning);
    }
    if let Some(rest) = &provenance.rest {
        let pretty = serde_json::to_string_pretty(rest).unwrap_or_default();
        let _ = writeln!(out, "  Provenienza LLM:");
        for line in pretty.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }

    if let Some(raw) = decode_payload(place.llm_raw_response.as_ref()) {
        let _ = writeln!(out, "  Response LLM (raw):");
        for line in raw.lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }

    out
}

fn format_job(out: &mut String, label: &str, job: &JobState) {
    let _ = write!(out, "  {:<14} {:<8}", label, job.status);
    if job.started_at.is_some() {
        let _ = write!(out, " start {}", format_timestamp(job.started_at.as_deref()));
    }
    if job.ended_at.is_some() {
        let _ = write!(out, " end {}", format_timestamp(job.ended_at.as_deref()));
    }
    if let Some(rc) = job.last_exit_code {
        let _ = write!(out, " rc={}", rc);
    }
    out.push('\n');

    let lines = job.lines();
    for line in &lines[lines.len().saturating_sub(TAIL_LINES)..] {
        let _ = writeln!(out, "      | {}", line);
    }
}

/// ジョブ状態の一覧（既知スロット → その他のスロット）
pub fn format_status(status: Option<&EtlStatus>) -> String {
    let Some(status) = status else {
        return "ジョブ状態: 不明（取得できません）\n".to_string();
    };

    let mut out = String::from("ジョブ状態:\n");
    for slot in JobSlot::ALL {
        match status.get(slot) {
            Some(job) => format_job(&mut out, slot.label(), job),
            None => {
                let _ = writeln!(out, "  {:<14} {:<8}", slot.label(), "idle");
            }
        }
    }
    for (name, job) in status.iter() {
        if JobSlot::ALL.iter().all(|s| s.as_key() != name) {
            format_job(&mut out, name, job);
        }
    }
    out
}

/// スピナー用の1行要約（例: "google_import=running pipeline=ok"）
pub fn format_summary(status: Option<&EtlStatus>) -> String {
    match status {
        Some(status) if !status.0.is_empty() => status
            .iter()
            .map(|(name, job)| format!("{}={}", name, job.status))
            .collect::<Vec<_>>()
            .join(" "),
        Some(_) => "ジョブなし".to_string(),
        None => "状態不明".to_string(),
    }
}
