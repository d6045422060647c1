//! Writing an [`AnalysisReport`] to disk.
//!
//! Output files are named `<stem>_<YYYYMMDD_HHMMSS>_<table>.<ext>` and land in
//! the requested directory:
//!
//! - `json`: the whole report, pretty-printed (`_report.json`)
//! - `csv`: the word table (`_words.csv`) and the leaderboards (`_rankings.csv`)
//! - `txt`: a readable summary with an hourly histogram (`_summary.txt`)

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::prelude::*;
use clap::ValueEnum;
use csv::WriterBuilder;
use log::info;

use crate::behavior::Metric;
use crate::error::Result;
use crate::report::{AnalysisReport, Leaderboard};

const HISTOGRAM_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
}

/// Neutralize cells a spreadsheet would evaluate as a formula.
pub fn csv_safe_cell(cell: String) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{cell}"),
        _ => cell,
    }
}

fn output_path(dir: &Path, stem: &str, stamp: &str, table: &str, ext: &str) -> PathBuf {
    dir.join(format!("{stem}_{stamp}_{table}.{ext}"))
}

fn save_file(content: &[u8], path: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content)?;
    Ok(())
}

fn format_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::AverageLength => format!("{value:.1}"),
        _ => format!("{value:.0}"),
    }
}

/// Write the report in `format` under `dir`. Returns the written paths.
pub fn export_report(
    report: &AnalysisReport,
    stem: &str,
    dir: &Path,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let written = match format {
        ExportFormat::Json => {
            let path = output_path(dir, stem, &stamp, "report", "json");
            save_file(serde_json::to_string_pretty(report)?.as_bytes(), &path)?;
            vec![path]
        }
        ExportFormat::Csv => {
            let words = output_path(dir, stem, &stamp, "words", "csv");
            save_file(&words_csv(report)?, &words)?;
            let rankings = output_path(dir, stem, &stamp, "rankings", "csv");
            save_file(&rankings_csv(&report.rankings)?, &rankings)?;
            vec![words, rankings]
        }
        ExportFormat::Txt => {
            let path = output_path(dir, stem, &stamp, "summary", "txt");
            save_file(render_summary(report).as_bytes(), &path)?;
            vec![path]
        }
    };
    for p in &written {
        info!("wrote {}", p.display());
    }
    Ok(written)
}

fn words_csv(report: &AnalysisReport) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(["rank", "word", "freq", "contributors", "samples"])?;
    for (i, w) in report.top_words.iter().enumerate() {
        let contributors = w
            .contributors
            .iter()
            .map(|c| format!("{}({})", c.name, c.count))
            .collect::<Vec<_>>()
            .join("; ");
        wtr.write_record([
            (i + 1).to_string(),
            csv_safe_cell(w.word.clone()),
            w.freq.to_string(),
            csv_safe_cell(contributors),
            csv_safe_cell(w.samples.join(" | ")),
        ])?;
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| e.into_error().into())
}

fn rankings_csv(boards: &[Leaderboard]) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(["board", "rank", "name", "id", "value"])?;
    for board in boards {
        for (i, e) in board.entries.iter().enumerate() {
            wtr.write_record([
                board.title.clone(),
                (i + 1).to_string(),
                csv_safe_cell(e.name.clone()),
                e.id.clone(),
                format_value(board.metric, e.value),
            ])?;
        }
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| e.into_error().into())
}

/// One line per hour, bars scaled to the busiest hour.
pub fn hour_histogram(hours: &[u64; 24]) -> String {
    let max = hours.iter().copied().max().unwrap_or(0);
    let mut out = String::new();
    for (hour, &count) in hours.iter().enumerate() {
        let bar = if max == 0 {
            0
        } else {
            (count as usize * HISTOGRAM_WIDTH).div_ceil(max as usize)
        };
        let _ = writeln!(
            out,
            "{hour:02} | {:<width$} {count}",
            "#".repeat(bar),
            width = HISTOGRAM_WIDTH
        );
    }
    out
}

/// Plain-text rendering of the report.
pub fn render_summary(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", report.chat_name);
    let _ = writeln!(out, "messages: {}", report.message_count);

    let _ = writeln!(out, "\n--- top words ---");
    for (i, w) in report.top_words.iter().enumerate() {
        let who = w
            .contributors
            .iter()
            .take(3)
            .map(|c| format!("{}({})", c.name, c.count))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "{:>3}. {} x{}  {}", i + 1, w.word, w.freq, who);
    }

    let _ = writeln!(out, "\n--- leaderboards ---");
    for board in report.rankings.iter().filter(|b| !b.entries.is_empty()) {
        let _ = writeln!(out, "[{}]", board.title);
        for (i, e) in board.entries.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>3}. {} {}",
                i + 1,
                e.name,
                format_value(board.metric, e.value)
            );
        }
    }

    let _ = writeln!(out, "\n--- hourly activity ---");
    out.push_str(&hour_histogram(&report.hour_distribution));

    if !report.discovered_words.is_empty() {
        let _ = writeln!(out, "\n--- new words ---");
        for d in &report.discovered_words {
            let _ = writeln!(
                out,
                "{} x{} (entropy {:.2}/{:.2}, pmi {:.2})",
                d.word, d.freq, d.left_entropy, d.right_entropy, d.min_pmi
            );
        }
    }
    if !report.merged_words.is_empty() {
        let _ = writeln!(out, "\n--- merged phrases ---");
        for m in &report.merged_words {
            let _ = writeln!(
                out,
                "{} = {}+{} x{} ({:.0}%)",
                m.merged,
                m.w1,
                m.w2,
                m.count,
                m.probability * 100.0
            );
        }
    }

    if !report.representative_users.is_empty() {
        let _ = writeln!(out, "\n--- representative words ---");
        for u in &report.representative_users {
            let words = u
                .words
                .iter()
                .map(|w| format!("{}({})", w.word, w.count))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                out,
                "{}: {}  [{} msgs, {:.2}/h]",
                u.name, words, u.stats.message_count, u.stats.messages_per_hour
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Contributor, RankEntry, WordDetail};

    fn report() -> AnalysisReport {
        let mut hours = [0; 24];
        hours[22] = 4;
        hours[23] = 2;
        AnalysisReport {
            chat_name: "测试群".to_string(),
            message_count: 6,
            top_words: vec![WordDetail {
                word: "=cmd".to_string(),
                freq: 3,
                contributors: vec![Contributor {
                    id: "1".to_string(),
                    name: "阿强".to_string(),
                    count: 3,
                }],
                samples: vec!["=cmd 跑一下".to_string()],
            }],
            rankings: vec![Leaderboard {
                metric: Metric::AverageLength,
                title: Metric::AverageLength.title().to_string(),
                entries: vec![RankEntry {
                    id: "1".to_string(),
                    name: "阿强".to_string(),
                    value: 12.345,
                }],
            }],
            hour_distribution: hours,
            representative_users: Vec::new(),
            discovered_words: Vec::new(),
            merged_words: Vec::new(),
        }
    }

    #[test]
    fn formula_cells_are_prefixed() {
        assert_eq!(csv_safe_cell("=SUM(A1)".to_string()), "'=SUM(A1)");
        assert_eq!(csv_safe_cell("@x".to_string()), "'@x");
        assert_eq!(csv_safe_cell("'=ok".to_string()), "'=ok");
        assert_eq!(csv_safe_cell("草".to_string()), "草");
    }

    #[test]
    fn histogram_scales_to_busiest_hour() {
        let h = hour_histogram(&report().hour_distribution);
        let lines: Vec<&str> = h.lines().collect();
        assert_eq!(lines.len(), 24);
        assert!(lines[22].starts_with(&format!("22 | {}", "#".repeat(HISTOGRAM_WIDTH))));
        assert!(lines[23].starts_with(&format!("23 | {} ", "#".repeat(HISTOGRAM_WIDTH / 2))));
        assert!(lines[0].ends_with(" 0"));
    }

    #[test]
    fn summary_renders_average_with_one_decimal() {
        let s = render_summary(&report());
        assert!(s.contains("[长文王]"));
        assert!(s.contains("阿强 12.3"));
    }

    #[test]
    fn csv_export_writes_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let paths = export_report(&report(), "chat", dir.path(), ExportFormat::Csv).unwrap();
        assert_eq!(paths.len(), 2);
        let words = fs::read_to_string(&paths[0]).unwrap();
        assert!(words.contains("'=cmd"));
        assert!(paths[0].to_string_lossy().ends_with("_words.csv"));
        let rankings = fs::read_to_string(&paths[1]).unwrap();
        assert!(rankings.contains("长文王,1,阿强,1,12.3"));
    }

    #[test]
    fn json_export_round_trips_as_value() {
        let dir = tempfile::tempdir().unwrap();
        let paths = export_report(&report(), "chat", dir.path(), ExportFormat::Json).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths[0]).unwrap()).unwrap();
        assert_eq!(v["chat_name"], "测试群");
        assert_eq!(v["hour_distribution"][22], 4);
        assert_eq!(v["rankings"][0]["metric"], "average_length");
    }
}
