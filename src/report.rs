//! End-of-run summary rendering.

use crate::batch::{BatchReport, LocaleCatalog};
use std::fmt::Write as _;

const HEADERS: [&str; 7] = [
    "Language",
    "Locale",
    "Entries",
    "Translated",
    "Failed",
    "Review",
    "Provider Hits",
];

/// One row per locale with per-provider hit counts.
pub fn summary_table(catalogs: &[LocaleCatalog]) -> String {
    let rows: Vec<[String; 7]> = catalogs
        .iter()
        .map(|catalog| {
            let summary = &catalog.summary;
            let hits = if summary.provider_hits.is_empty() {
                "-".to_string()
            } else {
                summary
                    .provider_hits
                    .iter()
                    .map(|(provider, count)| format!("{}={}", provider, count))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            [
                catalog.locale.display_name().to_string(),
                catalog.locale.catalog_tag().to_string(),
                summary.total.to_string(),
                summary.succeeded.to_string(),
                summary.failed.to_string(),
                summary.needs_review.to_string(),
                hits,
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &HEADERS.map(str::to_string), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    out
}

fn write_row(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            // Counts are right-aligned
            if (2..=5).contains(&i) {
                format!("{:>width$}", cell, width = width)
            } else {
                format!("{:<width$}", cell, width = width)
            }
        })
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

/// Entries whose accepted translation equals the source, grouped by locale.
pub fn review_list(catalogs: &[LocaleCatalog]) -> Vec<String> {
    catalogs
        .iter()
        .flat_map(|catalog| {
            catalog
                .results
                .iter()
                .filter(|result| result.needs_review)
                .map(move |result| {
                    format!(
                        "{}: {}",
                        catalog.locale.catalog_tag(),
                        result.entry_id.replace(crate::model::CONTEXT_SEPARATOR, " | ")
                    )
                })
        })
        .collect()
}

/// Full text report: table, review list and overall counters.
pub fn render(report: &BatchReport) -> String {
    let mut out = summary_table(&report.catalogs);

    let review = review_list(&report.catalogs);
    if !review.is_empty() {
        let _ = writeln!(out, "\nUnchanged by the provider, please review:");
        for line in review {
            let _ = writeln!(out, "  {}", line);
        }
    }

    let _ = writeln!(out, "\n{}", report.metrics);
    if report.cancelled {
        let _ = writeln!(out, "Run was interrupted; unfinished entries keep their source text.");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::LocaleSummary;
    use crate::i18n::{BatchMetrics, Locale};
    use crate::model::{MessageEntry, TranslationResult};
    use crate::providers::ProviderKind;

    fn catalog() -> LocaleCatalog {
        let clock_in = MessageEntry::simple("Clock In");
        let ok = MessageEntry::simple("OK");
        let post = MessageEntry::new("Post", Some("verb".to_string()), None);
        let results = vec![
            TranslationResult::translated(&clock_in, "fr", "Pointer".into(), Some(ProviderKind::Google), false),
            TranslationResult::translated(&ok, "fr", "OK".into(), Some(ProviderKind::MyMemory), true),
            TranslationResult::fallback(&post, "fr"),
        ];
        LocaleCatalog {
            locale: Locale::new("fr", "French", "fr_FR"),
            summary: LocaleSummary::from_results(&results),
            results,
        }
    }

    // ==================== Table Tests ====================

    #[test]
    fn test_summary_table_columns() {
        let table = summary_table(&[catalog()]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Language | Locale | Entries | Translated | Failed | Review | Provider Hits"));
        assert!(lines[1].contains("-+-"));
        assert!(lines[2].starts_with("French   | fr_FR  |"));
        assert!(lines[2].contains("google=1, mymemory=1"));
    }

    #[test]
    fn test_summary_table_counts() {
        let table = summary_table(&[catalog()]);
        let row: Vec<&str> = table.lines().nth(2).unwrap().split('|').map(str::trim).collect();
        assert_eq!(row[2..6], ["3", "2", "1", "1"]);
    }

    #[test]
    fn test_no_hits_renders_dash() {
        let mut catalog = catalog();
        catalog.summary.provider_hits.clear();
        let table = summary_table(&[catalog]);
        assert!(table.lines().nth(2).unwrap().ends_with("| -"));
    }

    // ==================== Report Tests ====================

    #[test]
    fn test_review_list() {
        assert_eq!(review_list(&[catalog()]), vec!["fr_FR: OK"]);
    }

    #[test]
    fn test_render_mentions_cancellation() {
        let metrics = BatchMetrics::new(3);
        metrics.record_pair(true, false);
        let report = BatchReport {
            catalogs: vec![catalog()],
            cancelled: true,
            metrics: metrics.report(),
        };

        let text = render(&report);
        assert!(text.contains("please review"));
        assert!(text.contains("interrupted"));
    }
}
