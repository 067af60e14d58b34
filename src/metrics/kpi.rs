//! Headline KPIs.
//!
//! Neither function can fail: missing values are skipped and an empty input
//! yields zeros.

use crate::domain::{JobRun, OperationalKpis, ProductKpis, ProductMetric, Ticket};
use crate::math::stats::mean_present;

pub fn compute_operational_kpis(tickets: &[Ticket], jobs: &[JobRun]) -> OperationalKpis {
    let flag = |v: Option<u8>| v.map(f64::from);

    OperationalKpis {
        tickets_total: tickets.len(),
        backlog: tickets.iter().filter(|t| t.reopen == Some(1)).count(),
        fcr: mean_present(tickets.iter().map(|t| flag(t.fcr))).unwrap_or(0.0) * 100.0,
        reopen_rate: mean_present(tickets.iter().map(|t| flag(t.reopen))).unwrap_or(0.0) * 100.0,
        ait_mean: mean_present(tickets.iter().map(|t| t.ait_min)).unwrap_or(0.0),
        tnps_mean: mean_present(tickets.iter().map(|t| t.tnps)).unwrap_or(0.0),
        jobs_total: jobs.len(),
    }
}

pub fn compute_product_kpis(product_metrics: &[ProductMetric]) -> ProductKpis {
    // Summed as f64 so large counts cannot overflow.
    let applications: f64 = product_metrics.iter().map(|p| p.applications as f64).sum();
    let conversions: f64 = product_metrics.iter().map(|p| p.conversions as f64).sum();

    let conversion_rate = if applications == 0.0 {
        0.0
    } else {
        conversions / applications * 100.0
    };

    ProductKpis {
        conversion_rate,
        eligibility_rate: mean_present(product_metrics.iter().map(|p| Some(p.eligibility_rate))).unwrap_or(0.0)
            * 100.0,
    }
}
