//! Quantitative data discovery
//!
//! Selects the rows and columns of a metric table that answer a routed
//! question and renders them as a text table for the answer prompt.

use crate::router::QueryIntent;
use bank_core::{Entity, Period, SectorKind};
use bank_data::{Granularity, KeyItems, MetricRow, MetricTable};
use comfy_table::{Table, presets};
use std::collections::HashSet;
use tracing::debug;

/// Metric columns shown when the question names none
pub const MAX_METRIC_COLUMNS: usize = 20;

/// Filtered slice of a metric table, ready for the prompt
#[derive(Debug, Clone, PartialEq)]
pub struct QuantitativeData {
    pub table_text: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub tickers: Vec<String>,
    pub periods: Vec<Period>,
}

/// Rows and columns of `table` relevant to `intent`; `None` when nothing
/// matches
pub fn discover(table: &MetricTable, intent: &QueryIntent, key_items: &KeyItems) -> Option<QuantitativeData> {
    let mut rows = filter_entities(table, intent);
    rows = filter_periods(table.granularity(), rows, intent);
    if rows.is_empty() {
        debug!(source = %table.source().display(), "No rows matched the question");
        return None;
    }
    sort_rows(&mut rows, &intent.entities);

    let metrics = select_metrics(table, intent, key_items);
    let mut header = vec!["TICKER".to_string(), "Type".to_string(), table.granularity().period_column().to_string()];
    header.extend(metrics.iter().cloned());

    let mut rendered = Table::new();
    rendered.load_preset(presets::ASCII_MARKDOWN);
    rendered.set_header(header.clone());
    for row in &rows {
        let mut cells = vec![
            row.ticker.clone(),
            row.sector.clone().unwrap_or_default(),
            row.period.to_string(),
        ];
        cells.extend(metrics.iter().map(|m| row.value(m).map(format_cell).unwrap_or_default()));
        rendered.add_row(cells);
    }

    let mut seen = HashSet::new();
    let tickers: Vec<String> = rows
        .iter()
        .filter(|r| seen.insert(r.ticker.as_str()))
        .map(|r| r.ticker.clone())
        .collect();
    let mut periods: Vec<Period> = rows.iter().map(|r| r.period).collect();
    periods.sort();
    periods.dedup();

    Some(QuantitativeData {
        table_text: rendered.to_string(),
        row_count: rows.len(),
        column_count: header.len(),
        columns: header,
        tickers,
        periods,
    })
}

fn filter_entities<'a>(table: &'a MetricTable, intent: &QueryIntent) -> Vec<&'a MetricRow> {
    if intent.all_banks {
        return table.filter(MetricRow::is_individual_bank);
    }
    if intent.entities.is_empty() {
        return table.rows().iter().collect();
    }

    let keys: Vec<&str> = intent.entities.iter().map(Entity::key).collect();
    let sector_keys: Vec<&str> = intent
        .entities
        .iter()
        .filter(|e| e.is_sector())
        .map(Entity::key)
        .collect();
    let whole_sector = intent.entities.contains(&Entity::Sector(SectorKind::Sector));
    let with_components = intent.need_components && !sector_keys.is_empty();

    table.filter(|row| {
        if keys.contains(&row.ticker.as_str()) {
            return true;
        }
        if !with_components {
            return false;
        }
        if whole_sector && row.is_individual_bank() {
            return true;
        }
        row.is_individual_bank()
            && row
                .sector
                .as_deref()
                .is_some_and(|s| sector_keys.contains(&s))
    })
}

fn filter_periods<'a>(granularity: Granularity, rows: Vec<&'a MetricRow>, intent: &QueryIntent) -> Vec<&'a MetricRow> {
    match granularity {
        Granularity::Quarterly => {
            let quarters = intent.quarters();
            if quarters.is_empty() {
                rows
            } else {
                rows.into_iter().filter(|r| quarters.contains(&r.period)).collect()
            }
        },
        Granularity::Yearly => {
            let years = intent.years();
            if years.is_empty() {
                match rows.iter().map(|r| r.period).max() {
                    Some(latest) => rows.into_iter().filter(|r| r.period == latest).collect(),
                    None => rows,
                }
            } else {
                rows.into_iter().filter(|r| years.contains(&r.period)).collect()
            }
        },
    }
}

/// Requested entities first in request order, components after; periods
/// ascending within an entity
fn sort_rows(rows: &mut [&MetricRow], entities: &[Entity]) {
    let rank = |ticker: &str| {
        entities
            .iter()
            .position(|e| e.key() == ticker)
            .unwrap_or(entities.len())
    };
    rows.sort_by(|a, b| {
        rank(&a.ticker)
            .cmp(&rank(&b.ticker))
            .then_with(|| a.ticker.cmp(&b.ticker))
            .then_with(|| a.period.cmp(&b.period))
    });
}

fn select_metrics(table: &MetricTable, intent: &QueryIntent, key_items: &KeyItems) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for metric in &intent.metrics {
        match table.resolve_column(metric, key_items) {
            Some(column) if !selected.contains(&column) => selected.push(column),
            Some(_) => {},
            None => debug!(metric = %metric, "Requested metric not in table"),
        }
    }
    if selected.is_empty() {
        selected = table
            .columns()
            .iter()
            .take(MAX_METRIC_COLUMNS)
            .cloned()
            .collect();
    }
    selected
}

/// Cell text: whole numbers for large values, up to four decimals otherwise
pub fn format_cell(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.4}");
        let text = text.trim_end_matches('0').trim_end_matches('.');
        if text.is_empty() || text == "-" { "0".to_string() } else { text.to_string() }
    }
}
