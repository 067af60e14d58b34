//! Synthetic lending datasets for environments without a warehouse.
//!
//! All randomness flows through an explicit generator passed in by the caller,
//! so a fixed seed (plus horizon and anchor date) reproduces the same data.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Normal, Poisson};

use crate::domain::{CONSIGNADO, DataSource, JobRun, JobStatus, ProductMetric, Ticket};
use crate::error::AppError;

pub const DEFAULT_MOCK_DAYS: usize = 120;
pub const DEFAULT_MOCK_SEED: u64 = 42;

/// Mean number of tickets opened per day.
const TICKETS_PER_DAY: f64 = 180.0;
const MINUTES_PER_DAY: i64 = 24 * 60;

const CANAIS: &[&str] = &["App", "Chat", "Telefone", "Email"];
const PRODUTOS: &[&str] = &["Pessoal", "Cartão", "Consignado"];
const CONVENIOS: &[&str] = &["INSS", "SIAPE", "SEDUC", "PM", "OUTROS"];
const SEGMENTOS: &[&str] = &["PF", "PJ"];
const UFS: &[&str] = &["SP", "RJ", "MG", "RS", "BA", "PR", "SC", "DF"];
const PRIORIDADES: &[&str] = &["Baixa", "Média", "Alta"];
const CATEGORIAS: &[&str] = &["Onboarding", "Cobrança", "Cartão", "Consignado", "Crédito", "Outros"];

const JOB_NAMES: &[&str] = &["etl_tickets", "etl_jobs", "agg_product", "train_model", "quality_check"];
const P_JOB_SUCCESS: f64 = 0.9;
const P_JOB_FAILED: f64 = 0.07;

const P_FCR: f64 = 0.75;
const P_REOPEN: f64 = 0.08;

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockOptions {
    pub days: usize,
    pub seed: u64,
    /// Data covers `[anchor - days, anchor)`.
    pub anchor: NaiveDate,
}

impl MockOptions {
    /// Options anchored at today's UTC date.
    pub fn new(days: usize, seed: u64) -> Self {
        Self {
            days,
            seed,
            anchor: Utc::now().date_naive(),
        }
    }

    pub fn with_anchor(mut self, anchor: NaiveDate) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn start_date(&self) -> NaiveDate {
        self.anchor - Duration::days(self.days as i64)
    }
}

impl Default for MockOptions {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DAYS, DEFAULT_MOCK_SEED)
    }
}

/// Generate all three families from one seeded generator.
///
/// Families are drawn in a fixed order (tickets, jobs, product metrics) so the
/// output depends only on `options`.
pub fn generate_mock_data(options: &MockOptions) -> Result<DataSource, AppError> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let start = options.start_date();

    let tickets = generate_mock_tickets(&mut rng, start, options.days)?;
    let jobs = generate_mock_jobs(&mut rng, start, options.days)?;
    let product_metrics = generate_mock_product_metrics(&mut rng, start, options.days)?;

    Ok(DataSource {
        tickets,
        jobs,
        product_metrics,
        absent_facets: BTreeSet::new(),
    })
}

/// Per-product noise profile for tickets.
struct TicketProfile {
    ait: Normal<f64>,
    tnps: Normal<f64>,
}

impl TicketProfile {
    fn new(consignado: bool) -> Result<Self, AppError> {
        let (ait_mean, tnps_mean) = if consignado { (35.0, 50.0) } else { (25.0, 55.0) };
        Ok(Self {
            ait: normal(ait_mean, 10.0)?,
            tnps: normal(tnps_mean, 15.0)?,
        })
    }
}

pub fn generate_mock_tickets<R: Rng + ?Sized>(
    rng: &mut R,
    start: NaiveDate,
    days: usize,
) -> Result<Vec<Ticket>, AppError> {
    let daily = Poisson::new(TICKETS_PER_DAY)
        .map_err(|e| AppError::Sampling(format!("ticket volume distribution: {e}")))?;
    let regular = TicketProfile::new(false)?;
    let consignado = TicketProfile::new(true)?;

    let mut out = Vec::with_capacity(days * TICKETS_PER_DAY as usize);
    let mut ticket_id = 1_i64;

    for day in day_starts(start, days) {
        let count: f64 = daily.sample(rng);
        for _ in 0..count as usize {
            let produto = pick(rng, PRODUTOS);
            let is_consignado = produto == CONSIGNADO;
            let profile = if is_consignado { &consignado } else { &regular };

            let convenio = is_consignado.then(|| pick(rng, CONVENIOS).to_string());
            let ait = profile.ait.sample(rng).max(2.0);
            let tnps = profile.tnps.sample(rng).clamp(-100.0, 100.0);
            let fcr = rng.gen_bool(P_FCR);
            let reopen = rng.gen_bool(P_REOPEN);

            out.push(Ticket {
                ticket_id,
                timestamp: random_minute(rng, day),
                canal: Some(pick(rng, CANAIS).to_string()),
                produto: Some(produto.to_string()),
                convenio,
                segmento: Some(pick(rng, SEGMENTOS).to_string()),
                estado: Some(pick(rng, UFS).to_string()),
                prioridade: Some(pick(rng, PRIORIDADES).to_string()),
                categoria: Some(pick(rng, CATEGORIAS).to_string()),
                fcr: Some(u8::from(fcr)),
                reopen: Some(u8::from(reopen)),
                ait_min: Some(ait),
                tnps: Some(tnps),
            });
            ticket_id += 1;
        }
    }

    Ok(out)
}

pub fn generate_mock_jobs<R: Rng + ?Sized>(
    rng: &mut R,
    start: NaiveDate,
    days: usize,
) -> Result<Vec<JobRun>, AppError> {
    let duration = normal(600.0, 120.0)?;
    let mut out = Vec::with_capacity(days * JOB_NAMES.len());

    for day in day_starts(start, days) {
        for &job in JOB_NAMES {
            let status = sample_status(rng);
            let duration_s = (duration.sample(rng) as i64).max(60);
            out.push(JobRun {
                job: job.to_string(),
                timestamp: random_minute(rng, day),
                status,
                duration_s,
            });
        }
    }

    Ok(out)
}

/// Per-product funnel profile.
struct FunnelProfile {
    applications: Normal<f64>,
    approval_rate: Normal<f64>,
    conversion_rate: Normal<f64>,
    eligibility: Normal<f64>,
}

impl FunnelProfile {
    fn new(consignado: bool) -> Result<Self, AppError> {
        let (apps, approve, convert, eligible) = if consignado {
            (350.0, 0.45, 0.5, 0.6)
        } else {
            (800.0, 0.55, 0.6, 0.7)
        };
        Ok(Self {
            applications: normal(apps, 120.0)?,
            approval_rate: normal(approve, 0.05)?,
            conversion_rate: normal(convert, 0.05)?,
            eligibility: normal(eligible, 0.05)?,
        })
    }
}

pub fn generate_mock_product_metrics<R: Rng + ?Sized>(
    rng: &mut R,
    start: NaiveDate,
    days: usize,
) -> Result<Vec<ProductMetric>, AppError> {
    let regular = FunnelProfile::new(false)?;
    let consignado = FunnelProfile::new(true)?;
    let mut out = Vec::with_capacity(days * PRODUTOS.len());

    for day in day_starts(start, days) {
        for &product in PRODUTOS {
            let profile = if product == CONSIGNADO { &consignado } else { &regular };

            let applications = (profile.applications.sample(rng) as i64).max(10);
            let approval_rate = profile.approval_rate.sample(rng).clamp(0.1, 0.95);
            let approvals = (applications as f64 * approval_rate) as i64;
            let conversion_rate = profile.conversion_rate.sample(rng).clamp(0.1, 0.95);
            let conversions = (approvals as f64 * conversion_rate) as i64;
            let eligibility_rate = profile.eligibility.sample(rng).clamp(0.2, 0.99);

            out.push(ProductMetric {
                date: day.date(),
                product: product.to_string(),
                applications,
                approvals,
                conversions,
                eligibility_rate,
            });
        }
    }

    Ok(out)
}

fn normal(mean: f64, sd: f64) -> Result<Normal<f64>, AppError> {
    Normal::new(mean, sd).map_err(|e| AppError::Sampling(format!("normal({mean}, {sd}): {e}")))
}

fn day_starts(start: NaiveDate, days: usize) -> impl Iterator<Item = NaiveDateTime> {
    (0..days as i64).map(move |d| (start + Duration::days(d)).and_time(NaiveTime::MIN))
}

fn random_minute<R: Rng + ?Sized>(rng: &mut R, day: NaiveDateTime) -> NaiveDateTime {
    day + Duration::minutes(rng.gen_range(0..MINUTES_PER_DAY))
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

fn sample_status<R: Rng + ?Sized>(rng: &mut R) -> JobStatus {
    let roll: f64 = rng.r#gen();
    if roll < P_JOB_SUCCESS {
        JobStatus::Success
    } else if roll < P_JOB_SUCCESS + P_JOB_FAILED {
        JobStatus::Failed
    } else {
        JobStatus::Skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate_source;

    fn options(days: usize) -> MockOptions {
        MockOptions::new(days, DEFAULT_MOCK_SEED).with_anchor(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    #[test]
    fn same_seed_same_data() {
        let a = generate_mock_data(&options(DEFAULT_MOCK_DAYS)).unwrap();
        let b = generate_mock_data(&options(DEFAULT_MOCK_DAYS)).unwrap();
        assert_eq!(a.tickets.len(), b.tickets.len());
        assert_eq!(a.tickets.first(), b.tickets.first());
        assert_eq!(a.tickets.last(), b.tickets.last());
        assert_eq!(a.jobs.last(), b.jobs.last());
        assert_eq!(a.product_metrics.last(), b.product_metrics.last());
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_data() {
        let a = generate_mock_data(&options(10)).unwrap();
        let mut other = options(10);
        other.seed = 7;
        let b = generate_mock_data(&other).unwrap();
        assert_ne!(a.tickets, b.tickets);
    }

    #[test]
    fn shapes_follow_the_horizon() {
        let data = generate_mock_data(&options(30)).unwrap();
        assert_eq!(data.jobs.len(), 30 * JOB_NAMES.len());
        assert_eq!(data.product_metrics.len(), 30 * PRODUTOS.len());
        // Poisson(180) over 30 days lands well inside this band.
        assert!(data.tickets.len() > 30 * 150 && data.tickets.len() < 30 * 210);

        let start = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(data.tickets.iter().all(|t| t.timestamp.date() >= start && t.timestamp.date() < end));
        assert!(data.product_metrics.iter().all(|p| p.date >= start && p.date < end));
    }

    #[test]
    fn generated_rows_are_schema_valid() {
        let data = generate_mock_data(&options(20)).unwrap();
        let validated = validate_source(&data).unwrap();
        assert_eq!(validated, data);
    }

    #[test]
    fn convenio_only_for_consignado_and_funnel_ordered() {
        let data = generate_mock_data(&options(20)).unwrap();
        for t in &data.tickets {
            assert_eq!(t.convenio.is_some(), t.produto.as_deref() == Some(CONSIGNADO));
            assert!(t.ait_min.unwrap() >= 2.0);
        }
        for p in &data.product_metrics {
            assert!(p.applications >= 10);
            assert!(p.conversions <= p.approvals && p.approvals <= p.applications);
            assert!((0.2..=0.99).contains(&p.eligibility_rate));
        }
        for j in &data.jobs {
            assert!(j.duration_s >= 60);
        }
    }
}
