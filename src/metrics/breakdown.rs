//! Grouped views over filtered data: per day, per category, per product, per convenio.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{CONSIGNADO, DataSource, ProductMetric, Ticket};
use crate::math::stats::mean_present;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub tickets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyExperience {
    pub date: NaiveDate,
    pub tnps: Option<f64>,
    pub ait: Option<f64>,
}

/// Funnel totals across products for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyFunnel {
    pub date: NaiveDate,
    pub applications: i64,
    pub approvals: i64,
    pub conversions: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub categoria: String,
    pub tickets: usize,
    /// FCR percent over tickets with a known flag.
    pub fcr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEligibility {
    pub product: String,
    /// Mean eligibility, percent.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvenioStats {
    pub convenio: String,
    pub tickets: usize,
    pub tnps: Option<f64>,
    pub ait: Option<f64>,
}

/// Every breakdown over one filtered dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdowns {
    pub daily_counts: Vec<DailyCount>,
    pub daily_experience: Vec<DailyExperience>,
    pub daily_funnel: Vec<DailyFunnel>,
    pub categories: Vec<CategoryStats>,
    pub eligibility: Vec<ProductEligibility>,
    pub convenios: Vec<ConvenioStats>,
}

pub fn compute_breakdowns(data: &DataSource) -> Breakdowns {
    Breakdowns {
        daily_counts: daily_ticket_counts(&data.tickets),
        daily_experience: daily_experience(&data.tickets),
        daily_funnel: daily_funnel(&data.product_metrics),
        categories: category_breakdown(&data.tickets),
        eligibility: eligibility_by_product(&data.product_metrics),
        convenios: convenio_breakdown(&data.tickets),
    }
}

/// Tickets grouped by calendar day, first through last day present.
fn by_day(tickets: &[Ticket]) -> Vec<(NaiveDate, Vec<&Ticket>)> {
    let mut groups: BTreeMap<NaiveDate, Vec<&Ticket>> = BTreeMap::new();
    for t in tickets {
        groups.entry(t.timestamp.date()).or_default().push(t);
    }
    let (Some(first), Some(last)) = (groups.keys().next().copied(), groups.keys().next_back().copied()) else {
        return Vec::new();
    };

    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| (d, groups.remove(&d).unwrap_or_default()))
        .collect()
}

/// Daily ticket counts with empty days filled with zero.
pub fn daily_ticket_counts(tickets: &[Ticket]) -> Vec<DailyCount> {
    by_day(tickets)
        .into_iter()
        .map(|(date, group)| DailyCount {
            date,
            tickets: group.len(),
        })
        .collect()
}

pub fn daily_experience(tickets: &[Ticket]) -> Vec<DailyExperience> {
    by_day(tickets)
        .into_iter()
        .map(|(date, group)| DailyExperience {
            date,
            tnps: mean_present(group.iter().map(|t| t.tnps)),
            ait: mean_present(group.iter().map(|t| t.ait_min)),
        })
        .collect()
}

/// Applications, approvals and conversions summed per date (dates present only).
pub fn daily_funnel(product_metrics: &[ProductMetric]) -> Vec<DailyFunnel> {
    let mut days: BTreeMap<NaiveDate, (i64, i64, i64)> = BTreeMap::new();
    for p in product_metrics {
        let totals = days.entry(p.date).or_default();
        totals.0 = totals.0.saturating_add(p.applications);
        totals.1 = totals.1.saturating_add(p.approvals);
        totals.2 = totals.2.saturating_add(p.conversions);
    }
    days.into_iter()
        .map(|(date, (applications, approvals, conversions))| DailyFunnel {
            date,
            applications,
            approvals,
            conversions,
        })
        .collect()
}

/// Tickets without a categoria are left out.
pub fn category_breakdown(tickets: &[Ticket]) -> Vec<CategoryStats> {
    let mut groups: BTreeMap<&str, Vec<&Ticket>> = BTreeMap::new();
    for t in tickets {
        if let Some(c) = t.categoria.as_deref() {
            groups.entry(c).or_default().push(t);
        }
    }
    groups
        .into_iter()
        .map(|(categoria, group)| CategoryStats {
            categoria: categoria.to_string(),
            tickets: group.len(),
            fcr: mean_present(group.iter().map(|t| t.fcr.map(f64::from))).map(|v| v * 100.0),
        })
        .collect()
}

pub fn eligibility_by_product(product_metrics: &[ProductMetric]) -> Vec<ProductEligibility> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for p in product_metrics {
        groups.entry(p.product.as_str()).or_default().push(p.eligibility_rate);
    }
    groups
        .into_iter()
        .map(|(product, rates)| ProductEligibility {
            product: product.to_string(),
            rate: rates.iter().sum::<f64>() / rates.len() as f64 * 100.0,
        })
        .collect()
}

/// Consignado tickets grouped by convenio (tickets without one are left out).
pub fn convenio_breakdown(tickets: &[Ticket]) -> Vec<ConvenioStats> {
    let mut groups: BTreeMap<&str, Vec<&Ticket>> = BTreeMap::new();
    for t in tickets.iter().filter(|t| t.produto.as_deref() == Some(CONSIGNADO)) {
        if let Some(c) = t.convenio.as_deref() {
            groups.entry(c).or_default().push(t);
        }
    }
    groups
        .into_iter()
        .map(|(convenio, group)| ConvenioStats {
            convenio: convenio.to_string(),
            tickets: group.len(),
            tnps: mean_present(group.iter().map(|t| t.tnps)),
            ait: mean_present(group.iter().map(|t| t.ait_min)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(day: u32, categoria: &str, produto: &str, convenio: Option<&str>, fcr: u8, tnps: f64) -> Ticket {
        Ticket {
            ticket_id: 1,
            timestamp: NaiveDate::from_ymd_opt(2025, 4, day).unwrap().and_hms_opt(10, 0, 0).unwrap(),
            canal: None,
            produto: Some(produto.into()),
            convenio: convenio.map(String::from),
            segmento: None,
            estado: None,
            prioridade: None,
            categoria: Some(categoria.into()),
            fcr: Some(fcr),
            reopen: None,
            ait_min: Some(20.0),
            tnps: Some(tnps),
        }
    }

    fn tickets() -> Vec<Ticket> {
        vec![
            ticket(1, "Cartão", "Cartão", None, 1, 60.0),
            ticket(1, "Cobrança", "Consignado", Some("INSS"), 0, 40.0),
            ticket(4, "Cartão", "Consignado", Some("INSS"), 1, 20.0),
            ticket(4, "Outros", "Consignado", Some("PM"), 1, 10.0),
        ]
    }

    #[test]
    fn daily_counts_fill_gaps_with_zero() {
        let counts: Vec<usize> = daily_ticket_counts(&tickets()).iter().map(|d| d.tickets).collect();
        assert_eq!(counts, vec![2, 0, 0, 2]);
        assert!(daily_ticket_counts(&[]).is_empty());
    }

    #[test]
    fn daily_experience_has_gaps_as_none() {
        let days = daily_experience(&tickets());
        assert_eq!(days.len(), 4);
        assert_eq!(days[0].tnps, Some(50.0));
        assert_eq!(days[1].tnps, None);
        assert_eq!(days[3].ait, Some(20.0));
    }

    #[test]
    fn category_counts_and_fcr() {
        let cats = category_breakdown(&tickets());
        assert_eq!(cats[0].categoria, "Cartão");
        assert_eq!(cats[0].tickets, 2);
        assert_eq!(cats[0].fcr, Some(100.0));
        assert_eq!(cats[1].fcr, Some(0.0));
    }

    #[test]
    fn convenio_only_counts_consignado() {
        let conv = convenio_breakdown(&tickets());
        assert_eq!(conv.len(), 2);
        assert_eq!(conv[0].convenio, "INSS");
        assert_eq!(conv[0].tickets, 2);
        assert_eq!(conv[0].tnps, Some(30.0));
    }

    fn metric(day: u32, product: &str, applications: i64, approvals: i64, conversions: i64) -> ProductMetric {
        ProductMetric {
            date: NaiveDate::from_ymd_opt(2025, 4, day).unwrap(),
            product: product.into(),
            applications,
            approvals,
            conversions,
            eligibility_rate: 0.6,
        }
    }

    #[test]
    fn funnel_sums_products_per_day() {
        let rows = vec![
            metric(2, "Pessoal", 100, 50, 20),
            metric(1, "Pessoal", 10, 5, 1),
            metric(2, "Consignado", 40, 20, 10),
        ];
        let funnel = daily_funnel(&rows);
        assert_eq!(funnel.len(), 2);
        assert_eq!(funnel[0].date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!((funnel[0].applications, funnel[0].approvals, funnel[0].conversions), (10, 5, 1));
        assert_eq!((funnel[1].applications, funnel[1].approvals, funnel[1].conversions), (140, 70, 30));
        assert!(daily_funnel(&[]).is_empty());
    }

    #[test]
    fn funnel_totals_saturate() {
        let rows = vec![metric(1, "Pessoal", i64::MAX, 1, 1), metric(1, "Cartão", 5, 1, 1)];
        assert_eq!(daily_funnel(&rows)[0].applications, i64::MAX);
    }

    #[test]
    fn eligibility_is_percent_per_product() {
        let rows = vec![
            ProductMetric {
                date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                product: "Pessoal".into(),
                applications: 10,
                approvals: 5,
                conversions: 1,
                eligibility_rate: 0.5,
            },
            ProductMetric {
                date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
                product: "Pessoal".into(),
                applications: 10,
                approvals: 5,
                conversions: 1,
                eligibility_rate: 0.7,
            },
        ];
        let out = eligibility_by_product(&rows);
        assert_eq!(out.len(), 1);
        assert!((out[0].rate - 60.0).abs() < 1e-9);
    }
}
