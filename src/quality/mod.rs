//! Advisory cross-field checks.
//!
//! These never fail a load; they produce one message per violated rule,
//! however many rows break it.

use tracing::warn;

use crate::domain::{ProductMetric, Ticket};

pub const NEGATIVE_AIT: &str = "negative AIT values found in tickets";
pub const TNPS_OUT_OF_RANGE: &str = "tNPS values outside [-100, 100] found in tickets";
pub const FUNNEL_ORDER: &str = "product rows with conversions > approvals or approvals > applications";
pub const ELIGIBILITY_OUT_OF_RANGE: &str = "eligibility rates outside [0, 1] found in product metrics";

pub fn check_consistency(tickets: &[Ticket], product_metrics: &[ProductMetric]) -> Vec<String> {
    let rules: [(&str, bool); 4] = [
        (NEGATIVE_AIT, tickets.iter().any(|t| t.ait_min.is_some_and(|v| v < 0.0))),
        (
            TNPS_OUT_OF_RANGE,
            tickets.iter().any(|t| t.tnps.is_some_and(|v| !(-100.0..=100.0).contains(&v))),
        ),
        (
            FUNNEL_ORDER,
            product_metrics
                .iter()
                .any(|p| p.approvals > p.applications || p.conversions > p.approvals),
        ),
        (
            ELIGIBILITY_OUT_OF_RANGE,
            product_metrics
                .iter()
                .any(|p| !(0.0..=1.0).contains(&p.eligibility_rate)),
        ),
    ];

    rules
        .into_iter()
        .filter(|(_, violated)| *violated)
        .map(|(message, _)| {
            warn!("consistency: {message}");
            message.to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ticket(ait: Option<f64>, tnps: Option<f64>) -> Ticket {
        Ticket {
            ticket_id: 1,
            timestamp: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap(),
            canal: None,
            produto: None,
            convenio: None,
            segmento: None,
            estado: None,
            prioridade: None,
            categoria: None,
            fcr: None,
            reopen: None,
            ait_min: ait,
            tnps,
        }
    }

    fn metric(applications: i64, approvals: i64, conversions: i64, eligibility_rate: f64) -> ProductMetric {
        ProductMetric {
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            product: "Pessoal".into(),
            applications,
            approvals,
            conversions,
            eligibility_rate,
        }
    }

    #[test]
    fn clean_data_has_no_issues() {
        let issues = check_consistency(&[ticket(Some(3.0), Some(-100.0))], &[metric(10, 10, 10, 1.0)]);
        assert!(issues.is_empty());
        assert!(check_consistency(&[], &[]).is_empty());
    }

    #[test]
    fn unvalidated_tnps_is_flagged() {
        let issues = check_consistency(&[ticket(None, Some(150.0))], &[]);
        assert_eq!(issues, vec![TNPS_OUT_OF_RANGE.to_string()]);
    }

    #[test]
    fn funnel_ordering_reported_once() {
        let products = vec![metric(10, 20, 5, 0.5), metric(10, 5, 8, 0.5), metric(10, 30, 40, 0.5)];
        let issues = check_consistency(&[], &products);
        assert_eq!(issues, vec![FUNNEL_ORDER.to_string()]);
    }

    #[test]
    fn every_rule_can_fire() {
        let issues = check_consistency(&[ticket(Some(-1.0), Some(-101.0))], &[metric(1, 2, 0, 1.5)]);
        assert_eq!(issues.len(), 4);
    }
}
