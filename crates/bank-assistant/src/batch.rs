//! Multi-entity collectors
//!
//! Both collectors index the already-loaded table once for the whole entity
//! set and then format each entity from its own slice of the index. The
//! single-entity functions build the same index for one entity, so a batch
//! over `N` entities is exactly the concatenation of `N` single calls.

use bank_core::{Entity, Period};
use bank_data::{
    CommentRecord, CommentaryCache, SectorAnalysis, SectorAnalysisTable, ValuationMetric,
    ValuationTable, percentile_of_score, z_score,
};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::fmt::Write;

/// Header placed in front of the valuation blocks
pub const VALUATION_HEADER: &str = "\n\nValuation Metrics:\n";

const ENTITY_SEPARATOR: &str = "\n\n";

// ---------------------------------------------------------------------------
// Commentary
// ---------------------------------------------------------------------------

/// Cached commentary and sector analysis available to the collector
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentarySources<'a> {
    pub comments: Option<&'a CommentaryCache>,
    pub analysis: Option<&'a SectorAnalysisTable>,
}

struct CommentaryIndex<'a> {
    by_ticker: HashMap<String, Vec<&'a CommentRecord>>,
    analysis: Vec<&'a SectorAnalysis>,
}

impl<'a> CommentaryIndex<'a> {
    fn build(entities: &[Entity], quarters: &[Period], sources: CommentarySources<'a>) -> Self {
        let wanted: Vec<String> = entities.iter().map(|e| e.key().to_uppercase()).collect();

        let mut by_ticker: HashMap<String, Vec<&CommentRecord>> = HashMap::new();
        if let Some(cache) = sources.comments {
            for record in cache.records() {
                let key = record.ticker.trim().to_uppercase();
                if wanted.contains(&key) && in_quarters(&record.quarter, quarters) {
                    by_ticker.entry(key).or_default().push(record);
                }
            }
        }
        for records in by_ticker.values_mut() {
            records.sort_by_key(|r| Period::parse(&r.quarter).ok());
        }

        let mut analysis: Vec<&SectorAnalysis> = if entities.iter().any(Entity::is_sector) {
            sources
                .analysis
                .map(|table| {
                    table
                        .rows()
                        .iter()
                        .filter(|r| in_quarters(&r.quarter, quarters))
                        .collect()
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        analysis.sort_by_key(|r| Period::parse(&r.quarter).ok());

        Self { by_ticker, analysis }
    }

    fn format(&self, entity: &Entity, quarters: &[Period]) -> String {
        let comments = self
            .by_ticker
            .get(&entity.key().to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let analysis: &[&SectorAnalysis] = if entity.is_sector() { &self.analysis } else { &[] };

        if comments.is_empty() && analysis.is_empty() {
            return format!(
                "No data available for {} in quarters: {}",
                entity,
                quarter_list(quarters)
            );
        }

        let mut out = String::new();
        if entity.is_sector() {
            let _ = writeln!(out, "=== {entity} Sector Analysis ===");
            for row in analysis {
                let _ = writeln!(out, "\n{}:", row.quarter);
                let _ = writeln!(out, "Key Changes: {}", or_na(&row.key_changes));
                let _ = writeln!(out, "Individual Highlights: {}", or_na(&row.individual_highlights));
                let _ = writeln!(out, "Forward Outlook: {}", or_na(&row.forward_outlook));
                let _ = writeln!(out, "Full Analysis: {}", or_na(&row.full_analysis));
                let _ = writeln!(out, "{}", "-".repeat(50));
            }
            for record in comments {
                let _ = writeln!(out, "\n{} Comment: {}", record.quarter, or_na(&record.comment));
            }
        } else {
            let _ = writeln!(out, "=== {entity} Bank Analysis ===");
            for record in comments {
                let _ = writeln!(out, "\n{}: {}", record.quarter, or_na(&record.comment));
            }
        }
        out
    }
}

/// Commentary text for one entity
pub fn commentary_for_entity(entity: &Entity, quarters: &[Period], sources: CommentarySources<'_>) -> String {
    CommentaryIndex::build(std::slice::from_ref(entity), quarters, sources).format(entity, quarters)
}

/// Commentary text for many entities from one pass over the cache
pub fn collect_commentary_batch(
    entities: &[Entity],
    quarters: &[Period],
    sources: CommentarySources<'_>,
) -> String {
    let index = CommentaryIndex::build(entities, quarters, sources);
    entities
        .iter()
        .map(|entity| index.format(entity, quarters))
        .collect::<Vec<_>>()
        .join(ENTITY_SEPARATOR)
}

/// Commentary for any number of entities
pub fn collect_commentary(entities: &[Entity], quarters: &[Period], sources: CommentarySources<'_>) -> String {
    match entities {
        [] => String::new(),
        [entity] => commentary_for_entity(entity, quarters, sources),
        _ => collect_commentary_batch(entities, quarters, sources),
    }
}

fn in_quarters(label: &str, quarters: &[Period]) -> bool {
    quarters.is_empty()
        || Period::parse(label).is_ok_and(|p| quarters.contains(&p))
}

fn quarter_list(quarters: &[Period]) -> String {
    if quarters.is_empty() {
        "all".to_string()
    } else {
        quarters.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }
}

fn or_na(text: &str) -> &str {
    if text.trim().is_empty() { "N/A" } else { text }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

type Series = Vec<(NaiveDate, f64)>;

/// Percentile (0 to 1) and z-score of a reading against a window
#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowStats {
    cdf: f64,
    z: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct RatioBlock {
    current_pb: Option<f64>,
    current_pe: Option<f64>,
    pb_1y: Option<WindowStats>,
    pb_full: Option<WindowStats>,
    pe_1y: Option<WindowStats>,
    pe_full: Option<WindowStats>,
}

struct SectorSeries {
    pb: Series,
    pe: Series,
}

struct ValuationIndex<'a> {
    table: &'a ValuationTable,
    latest: NaiveDate,
    since: NaiveDate,
    sectors: HashMap<String, SectorSeries>,
}

impl<'a> ValuationIndex<'a> {
    fn build(table: &'a ValuationTable, entities: &[Entity]) -> Option<Self> {
        let latest = table.latest_date()?;
        let since = latest - Duration::days(365);

        let mut sectors = HashMap::new();
        for entity in entities {
            let sector = match entity {
                Entity::Sector(kind) => Some(kind.as_str()),
                Entity::Bank(ticker) => table.sector_of(ticker),
            };
            if let Some(sector) = sector {
                sectors.entry(sector.to_string()).or_insert_with(|| SectorSeries {
                    pb: table.sector_daily_mean(sector, ValuationMetric::Pb),
                    pe: table.sector_daily_mean(sector, ValuationMetric::Pe),
                });
            }
        }

        Some(Self {
            table,
            latest,
            since,
            sectors,
        })
    }

    fn format(&self, entity: &Entity) -> String {
        match entity {
            Entity::Bank(ticker) => self.format_bank(ticker),
            Entity::Sector(kind) => self
                .sector_block(kind.as_str())
                .map(|block| render_block(entity.key(), &block))
                .unwrap_or_default(),
        }
    }

    fn format_bank(&self, ticker: &str) -> String {
        let Some(today) = self
            .table
            .rows_for(ticker)
            .find(|r| r.trade_date == self.latest)
        else {
            return String::new();
        };

        let block = self.block(
            &self.table.series(ticker, ValuationMetric::Pb),
            &self.table.series(ticker, ValuationMetric::Pe),
            today.pb,
            today.pe,
        );
        let mut out = render_block(ticker, &block);

        let comparison = self
            .table
            .sector_of(ticker)
            .and_then(|sector| self.sector_block(sector).map(|block| render_sector(sector, &block)));
        if let Some(comparison) = comparison {
            out.push_str(&comparison);
        }
        out
    }

    /// Block of a sector's daily mean series; absent when the sector has
    /// no reading on the latest date
    fn sector_block(&self, sector: &str) -> Option<RatioBlock> {
        let series = self.sectors.get(sector)?;
        let on_latest = |s: &Series| s.iter().find(|(d, _)| *d == self.latest).map(|(_, v)| *v);
        let current_pb = on_latest(&series.pb);
        let current_pe = on_latest(&series.pe);
        if current_pb.is_none() && current_pe.is_none() {
            return None;
        }
        Some(self.block(&series.pb, &series.pe, current_pb, current_pe))
    }

    fn block(&self, pb: &Series, pe: &Series, current_pb: Option<f64>, current_pe: Option<f64>) -> RatioBlock {
        RatioBlock {
            current_pb,
            current_pe,
            pb_1y: current_pb.and_then(|c| window_stats(pb, c, Some(self.since))),
            pb_full: current_pb.and_then(|c| window_stats(pb, c, None)),
            pe_1y: current_pe.and_then(|c| window_stats(pe, c, Some(self.since))),
            pe_full: current_pe.and_then(|c| window_stats(pe, c, None)),
        }
    }
}

fn window_stats(series: &Series, current: f64, since: Option<NaiveDate>) -> Option<WindowStats> {
    let values: Vec<f64> = series
        .iter()
        .filter(|(d, _)| since.is_none_or(|s| *d >= s))
        .map(|(_, v)| *v)
        .collect();
    (values.len() > 1).then(|| WindowStats {
        cdf: round4(percentile_of_score(&values, current) / 100.0),
        z: round4(z_score(&values, current)),
    })
}

fn render_block(label: &str, block: &RatioBlock) -> String {
    let mut out = format!("\n{label}:\n");
    let _ = writeln!(out, "- Current P/B: {}", opt(block.current_pb.map(round4)));
    let _ = writeln!(out, "- Current P/E: {}", opt(block.current_pe.map(round4)));
    write_stats(&mut out, "", block);
    out
}

fn render_sector(sector: &str, block: &RatioBlock) -> String {
    let mut out = format!("\nSector ({sector}) Comparison:\n");
    let _ = writeln!(out, "- Sector P/B: {}", opt(block.current_pb.map(round4)));
    let _ = writeln!(out, "- Sector P/E: {}", opt(block.current_pe.map(round4)));
    write_stats(&mut out, "Sector ", block);
    out
}

fn write_stats(out: &mut String, prefix: &str, block: &RatioBlock) {
    for (ratio, one_year, full) in [("P/B", block.pb_1y, block.pb_full), ("P/E", block.pe_1y, block.pe_full)] {
        let _ = writeln!(out, "- {prefix}{ratio} 1Y CDF: {}", opt(one_year.map(|s| s.cdf)));
        let _ = writeln!(out, "- {prefix}{ratio} 1Y Z-score: {}", opt(one_year.map(|s| s.z)));
        let _ = writeln!(out, "- {prefix}{ratio} Full CDF: {}", opt(full.map(|s| s.cdf)));
        let _ = writeln!(out, "- {prefix}{ratio} Full Z-score: {}", opt(full.map(|s| s.z)));
    }
}

/// Valuation block of one entity; empty when it has no reading on the
/// latest trade date
pub fn valuation_for_entity(table: &ValuationTable, entity: &Entity) -> String {
    ValuationIndex::build(table, std::slice::from_ref(entity))
        .map(|index| index.format(entity))
        .unwrap_or_default()
}

/// Valuation context for many entities; empty when no entity has data
pub fn valuation_context(table: &ValuationTable, entities: &[Entity]) -> String {
    let Some(index) = ValuationIndex::build(table, entities) else {
        return String::new();
    };
    let body: String = entities.iter().map(|e| index.format(e)).collect();
    if body.is_empty() {
        String::new()
    } else {
        format!("{VALUATION_HEADER}{body}")
    }
}

/// Valuation context for a single entity, same layout as the batch
pub fn valuation_context_single(table: &ValuationTable, entity: &Entity) -> String {
    let body = valuation_for_entity(table, entity);
    if body.is_empty() {
        body
    } else {
        format!("{VALUATION_HEADER}{body}")
    }
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Render a number the way reports show it: `2.0`, `1.2345`
pub(crate) fn num(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') && !text.contains('e') {
        format!("{text}.0")
    } else {
        text
    }
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_core::SectorKind;

    fn bank(t: &str) -> Entity {
        Entity::Bank(t.to_string())
    }

    fn record(ticker: &str, quarter: &str, comment: &str) -> CommentRecord {
        CommentRecord {
            ticker: ticker.to_string(),
            sector: String::new(),
            quarter: quarter.to_string(),
            comment: comment.to_string(),
            generated_at: "2025-01-01 00:00:00".to_string(),
        }
    }

    fn cache() -> CommentaryCache {
        let mut cache = CommentaryCache::default();
        for r in [
            record("ACB", "2Q24", "ACB second"),
            record("ACB", "1Q24", "ACB first"),
            record("VCB", "1Q24", "VCB first"),
            record("SOCB", "1Q24", "SOCB steady"),
            record("ACB", "3Q23", "outside window"),
        ] {
            cache.upsert(r);
        }
        cache
    }

    fn analysis() -> SectorAnalysisTable {
        SectorAnalysisTable::from_rows(vec![SectorAnalysis {
            quarter: "1Q24".to_string(),
            key_changes: "NIM compression".to_string(),
            individual_highlights: "VCB leads".to_string(),
            forward_outlook: "Recovery".to_string(),
            full_analysis: String::new(),
        }])
    }

    fn quarters() -> Vec<Period> {
        vec![Period::quarter(2024, 1).unwrap(), Period::quarter(2024, 2).unwrap()]
    }

    #[test]
    fn test_bank_commentary_in_period_order() {
        let cache = cache();
        let sources = CommentarySources {
            comments: Some(&cache),
            analysis: None,
        };
        let text = commentary_for_entity(&bank("ACB"), &quarters(), sources);
        assert_eq!(text, "=== ACB Bank Analysis ===\n\n1Q24: ACB first\n\n2Q24: ACB second\n");
    }

    #[test]
    fn test_sector_commentary_includes_analysis() {
        let (cache, table) = (cache(), analysis());
        let sources = CommentarySources {
            comments: Some(&cache),
            analysis: Some(&table),
        };
        let text = commentary_for_entity(&Entity::Sector(SectorKind::Socb), &quarters(), sources);
        assert!(text.starts_with("=== SOCB Sector Analysis ===\n\n1Q24:\nKey Changes: NIM compression\n"));
        assert!(text.contains("Full Analysis: N/A\n"));
        assert!(text.ends_with("\n1Q24 Comment: SOCB steady\n"));
    }

    #[test]
    fn test_missing_entity_message() {
        let cache = cache();
        let sources = CommentarySources {
            comments: Some(&cache),
            analysis: None,
        };
        assert_eq!(
            commentary_for_entity(&bank("TCB"), &quarters(), sources),
            "No data available for TCB in quarters: 1Q24, 2Q24"
        );
        assert_eq!(
            commentary_for_entity(&bank("TCB"), &[], CommentarySources::default()),
            "No data available for TCB in quarters: all"
        );
    }

    #[test]
    fn test_commentary_batch_equals_single_calls() {
        let (cache, table) = (cache(), analysis());
        let sources = CommentarySources {
            comments: Some(&cache),
            analysis: Some(&table),
        };
        let entities = vec![bank("VCB"), Entity::Sector(SectorKind::Socb), bank("ACB"), bank("TCB")];

        let batch = collect_commentary_batch(&entities, &quarters(), sources);
        let singles: Vec<String> = entities
            .iter()
            .map(|e| commentary_for_entity(e, &quarters(), sources))
            .collect();
        assert_eq!(batch, singles.join("\n\n"));

        let one = vec![bank("ACB")];
        assert_eq!(
            collect_commentary_batch(&one, &quarters(), sources),
            commentary_for_entity(&one[0], &quarters(), sources)
        );
    }

    const VALUATION_CSV: &str = "\
TICKER,Type,TRADE_DATE,PE_RATIO,PX_TO_BOOK_RATIO,PX_TO_SALES_RATIO
VCB,SOCB,2024-01-02,14,2.6,
VCB,SOCB,2024-01-03,15,2.7,
VCB,SOCB,2024-01-04,16,2.8,
BID,SOCB,2024-01-02,10,1.8,
BID,SOCB,2024-01-03,11,1.9,
BID,SOCB,2024-01-04,12,2.0,
ACB,Private_1,2024-01-02,7,1.4,
ACB,Private_1,2024-01-03,6,1.3,
";

    fn valuation_table() -> ValuationTable {
        ValuationTable::from_reader(std::path::Path::new("Valuation_banking.csv"), VALUATION_CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_bank_valuation_block() {
        let table = valuation_table();
        let text = valuation_context_single(&table, &bank("VCB"));
        assert!(text.starts_with("\n\nValuation Metrics:\n\nVCB:\n- Current P/B: 2.8\n- Current P/E: 16.0\n"));
        assert!(text.contains("- P/E Full CDF: 1.0\n- P/E Full Z-score: 1.0\n"));
        assert!(text.contains("\nSector (SOCB) Comparison:\n- Sector P/B: 2.4\n- Sector P/E: 14.0\n"));
    }

    #[test]
    fn test_sector_entity_uses_daily_mean() {
        let table = valuation_table();
        let text = valuation_for_entity(&table, &Entity::Sector(SectorKind::Socb));
        assert!(text.starts_with("\nSOCB:\n- Current P/B: 2.4\n- Current P/E: 14.0\n"));
        assert!(!text.contains("Comparison"));
    }

    #[test]
    fn test_entity_without_latest_reading_skipped() {
        let table = valuation_table();
        assert_eq!(valuation_for_entity(&table, &bank("ACB")), "");
        assert_eq!(valuation_context(&table, &[bank("ACB"), bank("XYZ")]), "");
        assert_eq!(valuation_context(&ValuationTable::default(), &[bank("VCB")]), "");
    }

    #[test]
    fn test_valuation_batch_equals_single_calls() {
        let table = valuation_table();
        let entities = vec![bank("BID"), bank("ACB"), Entity::Sector(SectorKind::Socb), bank("VCB")];
        let batch = valuation_context(&table, &entities);
        let body: String = entities.iter().map(|e| valuation_for_entity(&table, e)).collect();
        assert_eq!(batch, format!("{VALUATION_HEADER}{body}"));
        assert_eq!(
            valuation_context(&table, &[bank("VCB")]),
            valuation_context_single(&table, &bank("VCB"))
        );
    }

    #[test]
    fn test_num_rendering() {
        assert_eq!(num(2.0), "2.0");
        assert_eq!(num(1.2345), "1.2345");
        assert_eq!(round4(0.123_456), 0.1235);
    }
}
