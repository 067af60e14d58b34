//! KPI aggregation and breakdowns.

pub mod breakdown;
pub mod kpi;

pub use breakdown::{
    Breakdowns, CategoryStats, ConvenioStats, DailyCount, DailyExperience, DailyFunnel, ProductEligibility,
    category_breakdown, compute_breakdowns, convenio_breakdown, daily_experience, daily_funnel,
    daily_ticket_counts, eligibility_by_product,
};
pub use kpi::{compute_operational_kpis, compute_product_kpis};
