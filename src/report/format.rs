//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{DataSource, Facet, FacetSet, FilterSpec, ForecastRow, OperationalKpis, ProductKpis};
use crate::error::SchemaViolations;
use crate::metrics::Breakdowns;

/// Most recent days shown in the funnel block.
const FUNNEL_DAYS: usize = 7;

/// Headline KPI block.
pub fn format_kpis(op: &OperationalKpis, product: &ProductKpis) -> String {
    let mut out = String::new();
    out.push_str("KPIs:\n");
    out.push_str(&format!("  {:<16} {:>10}\n", "Tickets", op.tickets_total));
    out.push_str(&format!("  {:<16} {:>10}\n", "Backlog", op.backlog));
    out.push_str(&format!("  {:<16} {:>9.1}%\n", "FCR", op.fcr));
    out.push_str(&format!("  {:<16} {:>9.1}%\n", "Reopen", op.reopen_rate));
    out.push_str(&format!("  {:<16} {:>10.1}\n", "AIT (min)", op.ait_mean));
    out.push_str(&format!("  {:<16} {:>10.1}\n", "tNPS", op.tnps_mean));
    out.push_str(&format!("  {:<16} {:>10}\n", "Jobs", op.jobs_total));
    out.push_str(&format!("  {:<16} {:>9.1}%\n", "Conversion", product.conversion_rate));
    out.push_str(&format!("  {:<16} {:>9.1}%\n", "Eligibility", product.eligibility_rate));
    out
}

pub fn format_facets(facets: &FacetSet) -> String {
    let mut out = String::new();
    match (facets.min_date, facets.max_date) {
        (Some(min), Some(max)) => out.push_str(&format!("Dates: {min} .. {max}\n")),
        _ => out.push_str("Dates: (no tickets)\n"),
    }
    for facet in Facet::ALL {
        let values = facets.values_of(facet);
        let shown = if values.is_empty() {
            "(none)".to_string()
        } else {
            values.join(", ")
        };
        out.push_str(&format!("{:<22} {shown}\n", format!("{}:", facet.display_name())));
    }
    out
}

/// One line describing the active filter.
pub fn format_filter(spec: &FilterSpec) -> String {
    let mut parts = vec![format!("{} .. {}", spec.start, spec.end)];
    for facet in Facet::ALL {
        if let Some(values) = spec.selected(facet) {
            let joined: Vec<&str> = values.iter().map(String::as_str).collect();
            parts.push(format!("{}={}", facet.column(), joined.join("|")));
        }
    }
    format!("Filter: {}\n", parts.join("  "))
}

pub fn format_issues(issues: &[String]) -> String {
    if issues.is_empty() {
        return "Consistency: no issues\n".to_string();
    }
    let mut out = String::from("Consistency issues:\n");
    for issue in issues {
        out.push_str(&format!("  ! {issue}\n"));
    }
    out
}

pub fn format_row_counts(data: &DataSource) -> String {
    let mut out = String::new();
    for (family, rows) in data.row_counts() {
        out.push_str(&format!("{:<16} {:>8} rows\n", family.table_label(), rows));
    }
    out
}

/// Family/row/column listing of a failed validation.
pub fn format_violations(violations: &SchemaViolations, limit: usize) -> String {
    let mut out = format!("{} violation(s)\n", violations.len());
    for v in violations.iter().take(limit) {
        out.push_str(&format!("  - {v}\n"));
    }
    if violations.len() > limit {
        out.push_str(&format!("  ... and {} more\n", violations.len() - limit));
    }
    out
}

pub fn format_forecast_table(rows: &[ForecastRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>10} {:>10}\n", "date", "observed", "predicted"));
    out.push_str(&format!("{:-<10} {:-<10} {:-<10}\n", "", "", ""));
    for r in rows {
        let observed = r.observed.map(|v| format!("{v:.1}")).unwrap_or_default();
        out.push_str(format!("{:<10} {:>10} {:>10.1}", r.date, observed, r.predicted).trim_end());
        out.push('\n');
    }
    out
}

pub fn format_breakdowns(b: &Breakdowns) -> String {
    let mut out = String::new();

    out.push_str("Tickets by category:\n");
    out.push_str(&format!("  {:<14} {:>8} {:>8}\n", "categoria", "tickets", "fcr%"));
    for c in &b.categories {
        out.push_str(&format!("  {:<14} {:>8} {:>8}\n", truncate(&c.categoria, 14), c.tickets, fmt_opt(c.fcr)));
    }

    out.push_str("\nEligibility by product:\n");
    for e in &b.eligibility {
        out.push_str(&format!("  {:<14} {:>7.1}%\n", truncate(&e.product, 14), e.rate));
    }

    out.push_str(&format!("\nFunnel (last {FUNNEL_DAYS} days):\n"));
    if b.daily_funnel.is_empty() {
        out.push_str("  (no product rows)\n");
    } else {
        out.push_str(&format!("  {:<10} {:>12} {:>10} {:>11}\n", "date", "applications", "approvals", "conversions"));
        let skip = b.daily_funnel.len().saturating_sub(FUNNEL_DAYS);
        for day in &b.daily_funnel[skip..] {
            out.push_str(&format!(
                "  {:<10} {:>12} {:>10} {:>11}\n",
                day.date.to_string(),
                day.applications,
                day.approvals,
                day.conversions
            ));
        }
    }

    out.push_str("\nConsignado by convenio:\n");
    if b.convenios.is_empty() {
        out.push_str("  (no Consignado tickets)\n");
    } else {
        out.push_str(&format!("  {:<14} {:>8} {:>8} {:>8}\n", "convenio", "tickets", "tnps", "ait"));
        for c in &b.convenios {
            out.push_str(&format!(
                "  {:<14} {:>8} {:>8} {:>8}\n",
                truncate(&c.convenio, 14),
                c.tickets,
                fmt_opt(c.tnps),
                fmt_opt(c.ait)
            ));
        }
    }

    out
}

/// Count, mean and a five-bin histogram of scores in [0, 1].
pub fn format_propensity(scores: &[f64]) -> String {
    if scores.is_empty() {
        return "Propensity: not enough data\n".to_string();
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let mut bins = [0usize; 5];
    for s in scores {
        let idx = ((s.clamp(0.0, 1.0) * 5.0) as usize).min(4);
        bins[idx] += 1;
    }

    let mut out = format!("Propensity: n={} mean={mean:.3}\n", scores.len());
    for (i, count) in bins.iter().enumerate() {
        let lo = i as f64 / 5.0;
        out.push_str(format!("  [{lo:.1}, {:.1}) {:>4} {}", lo + 0.2, count, "#".repeat(*count)).trim_end());
        out.push('\n');
    }
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.1}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::metrics::DailyFunnel;

    #[test]
    fn forecast_table_leaves_future_observed_blank() {
        let rows = vec![
            ForecastRow {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                observed: Some(180.0),
                predicted: 176.3,
            },
            ForecastRow {
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                observed: None,
                predicted: 181.0,
            },
        ];
        let expected = concat!(
            "date         observed  predicted\n",
            "---------- ---------- ----------\n",
            "2025-01-01      180.0      176.3\n",
            "2025-01-02                 181.0\n",
        );
        assert_eq!(format_forecast_table(&rows), expected);
    }

    #[test]
    fn issues_block() {
        assert_eq!(format_issues(&[]), "Consistency: no issues\n");
        let out = format_issues(&["negative AIT".to_string()]);
        assert!(out.contains("  ! negative AIT"));
    }

    #[test]
    fn filter_line_lists_restricted_facets_only() {
        let spec = FilterSpec::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .with(Facet::Estado, ["SP", "RJ"])
        .with(Facet::Canal, Vec::<String>::new());
        assert_eq!(format_filter(&spec), "Filter: 2025-01-01 .. 2025-01-31  estado=RJ|SP\n");
    }

    #[test]
    fn propensity_histogram_bins() {
        let out = format_propensity(&[0.05, 0.1, 0.95, 1.0]);
        assert!(out.starts_with("Propensity: n=4 mean=0.525\n"));
        assert!(out.contains("[0.0, 0.2)    2 ##"));
        assert!(out.contains("[0.8, 1.0)    2 ##"));
        assert_eq!(format_propensity(&[]), "Propensity: not enough data\n");
    }

    #[test]
    fn funnel_block_shows_recent_days_only() {
        let daily_funnel = (1..=9)
            .map(|d| DailyFunnel {
                date: NaiveDate::from_ymd_opt(2025, 1, d).unwrap(),
                applications: 100,
                approvals: 50,
                conversions: 25,
            })
            .collect();
        let out = format_breakdowns(&Breakdowns {
            daily_funnel,
            ..Breakdowns::default()
        });
        assert!(out.contains("Funnel (last 7 days):\n"));
        assert!(!out.contains("2025-01-02"));
        assert!(out.contains("  2025-01-03          100         50          25\n"));
        assert!(out.contains("  2025-01-09"));
        assert!(format_breakdowns(&Breakdowns::default()).contains("  (no product rows)\n"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Consignado", 5), "Cons.");
        assert_eq!(truncate("PF", 5), "PF");
    }
}
