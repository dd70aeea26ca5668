//! Artifact export — CSV and JSON files for a run, a sweep or a parity check.
//!
//! A run directory holds:
//! - `events.csv` — one row per confirmed event
//! - `trades.csv` — one row per closed trade
//! - `trades.json` — the same trades, full precision
//! - `summary.json` — the `RunSummary`
//!
//! An event-study directory holds `events.csv` (one row per event and
//! horizon) and `summary.csv` (one row per sample, side and horizon).

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use shockflip_core::domain::{ShockFlipEvent, Trade};

use crate::event_study::EventStudy;
use crate::parity::ParityReport;
use crate::runner::RunReport;
use crate::sweep::SweepRow;

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: side, trigger_index, confirm_index, entry_index, confirm_time,
/// z, threshold, atr, close
pub fn export_events_csv(events: &[ShockFlipEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "trigger_index",
        "confirm_index",
        "entry_index",
        "confirm_time",
        "z",
        "threshold",
        "atr",
        "close",
    ])?;
    for e in events {
        wtr.write_record([
            e.side.to_string(),
            e.trigger_index.to_string(),
            e.confirm_index.to_string(),
            e.entry_index.to_string(),
            e.confirm_time.to_rfc3339(),
            format!("{:.6}", e.z),
            format!("{:.6}", e.threshold),
            format!("{:.6}", e.atr),
            format!("{:.6}", e.close),
        ])?;
    }
    into_string(wtr)
}

/// One row per trade, columns in `Trade` field order.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    serialize_rows(trades)
}

pub fn export_sweep_csv(rows: &[SweepRow]) -> Result<String> {
    serialize_rows(rows)
}

pub fn export_event_study_csv(study: &EventStudy) -> Result<(String, String)> {
    Ok((serialize_rows(&study.outcomes)?, serialize_rows(&study.summary)?))
}

fn serialize_rows<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row)?;
    }
    into_string(wtr)
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundles ───────────────────────────────────────────────

/// Write the full artifact set for one run into `dir` (created if needed).
pub fn save_run_artifacts(report: &RunReport, dir: &Path) -> Result<()> {
    ensure_dir(dir)?;
    write(dir, "events.csv", &export_events_csv(&report.events)?)?;
    write(dir, "trades.csv", &export_trades_csv(&report.trades)?)?;
    let trades_json =
        serde_json::to_string_pretty(&report.trades).context("failed to serialize trades")?;
    write(dir, "trades.json", &trades_json)?;
    let summary =
        serde_json::to_string_pretty(&report.summary).context("failed to serialize summary")?;
    write(dir, "summary.json", &summary)
}

pub fn save_sweep_artifacts(rows: &[SweepRow], dir: &Path) -> Result<()> {
    ensure_dir(dir)?;
    write(dir, "sweep.csv", &export_sweep_csv(rows)?)
}

pub fn save_event_study_artifacts(study: &EventStudy, dir: &Path) -> Result<()> {
    ensure_dir(dir)?;
    let (events, summary) = export_event_study_csv(study)?;
    write(dir, "events.csv", &events)?;
    write(dir, "summary.csv", &summary)
}

pub fn save_parity_report(report: &ParityReport, dir: &Path) -> Result<()> {
    ensure_dir(dir)?;
    let json = serde_json::to_string_pretty(report).context("failed to serialize parity report")?;
    write(dir, "parity.json", &json)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))
}

fn write(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}
