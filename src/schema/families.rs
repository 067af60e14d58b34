//! Canonical schemas for tickets, job runs and product metrics.

use std::collections::BTreeSet;

use tracing::info;

use crate::domain::{DataSource, Facet, JobRun, JobStatus, ProductMetric, RecordFamily, Ticket};
use crate::error::{AppError, SchemaViolations};
use crate::schema::column::{Check, ColumnSpec};
use crate::schema::validate::{Record, revalidate, validate_table};
use crate::schema::value::{ColumnKind, RawTable, Value};

const TICKET_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("ticket_id", ColumnKind::Int).checked(Check::Min(1.0)).unique(),
    ColumnSpec::required("timestamp", ColumnKind::DateTime),
    ColumnSpec::optional("canal", ColumnKind::Text),
    ColumnSpec::optional("produto", ColumnKind::Text),
    ColumnSpec::optional("convenio", ColumnKind::Text),
    ColumnSpec::optional("segmento", ColumnKind::Text),
    ColumnSpec::optional("estado", ColumnKind::Text),
    ColumnSpec::optional("prioridade", ColumnKind::Text),
    ColumnSpec::optional("categoria", ColumnKind::Text),
    ColumnSpec::optional("fcr", ColumnKind::Int).checked(Check::Flag),
    ColumnSpec::optional("reopen", ColumnKind::Int).checked(Check::Flag),
    ColumnSpec::optional("ait_min", ColumnKind::Float).checked(Check::Min(0.0)),
    ColumnSpec::optional("tnps", ColumnKind::Float).checked(Check::Range(-100.0, 100.0)),
];

const JOB_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("job", ColumnKind::Text),
    ColumnSpec::required("timestamp", ColumnKind::DateTime),
    ColumnSpec::required("status", ColumnKind::Text).checked(Check::OneOf(&JobStatus::LABELS)),
    ColumnSpec::required("duration_s", ColumnKind::Int).checked(Check::Min(0.0)),
];

const PRODUCT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("date", ColumnKind::Date),
    ColumnSpec::required("product", ColumnKind::Text),
    ColumnSpec::required("applications", ColumnKind::Int).checked(Check::Min(0.0)),
    ColumnSpec::required("approvals", ColumnKind::Int).checked(Check::Min(0.0)),
    ColumnSpec::required("conversions", ColumnKind::Int).checked(Check::Min(0.0)),
    ColumnSpec::required("eligibility_rate", ColumnKind::Float).checked(Check::Range(0.0, 1.0)),
];

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn flag(value: &Value) -> Result<Option<u8>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Int(0) => Ok(Some(0)),
        Value::Int(1) => Ok(Some(1)),
        other => Err(format!("{other} is not 0/1")),
    }
}

impl Record for Ticket {
    const FAMILY: RecordFamily = RecordFamily::Tickets;
    const COLUMNS: &'static [ColumnSpec] = TICKET_COLUMNS;

    fn from_values(values: &[Value]) -> Result<Self, String> {
        let [
            Value::Int(ticket_id),
            Value::DateTime(timestamp),
            canal,
            produto,
            convenio,
            segmento,
            estado,
            prioridade,
            categoria,
            fcr,
            reopen,
            ait_min,
            tnps,
        ] = values
        else {
            return Err("ticket row does not match the schema".to_string());
        };

        Ok(Ticket {
            ticket_id: *ticket_id,
            timestamp: *timestamp,
            canal: text(canal),
            produto: text(produto),
            convenio: text(convenio),
            segmento: text(segmento),
            estado: text(estado),
            prioridade: text(prioridade),
            categoria: text(categoria),
            fcr: flag(fcr)?,
            reopen: flag(reopen)?,
            ait_min: ait_min.as_f64(),
            tnps: tnps.as_f64(),
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Int(self.ticket_id),
            Value::DateTime(self.timestamp),
            Value::from(self.canal.clone()),
            Value::from(self.produto.clone()),
            Value::from(self.convenio.clone()),
            Value::from(self.segmento.clone()),
            Value::from(self.estado.clone()),
            Value::from(self.prioridade.clone()),
            Value::from(self.categoria.clone()),
            Value::from(self.fcr),
            Value::from(self.reopen),
            Value::from(self.ait_min),
            Value::from(self.tnps),
        ]
    }
}

impl Record for JobRun {
    const FAMILY: RecordFamily = RecordFamily::Jobs;
    const COLUMNS: &'static [ColumnSpec] = JOB_COLUMNS;

    fn from_values(values: &[Value]) -> Result<Self, String> {
        let [Value::Text(job), Value::DateTime(timestamp), Value::Text(status), Value::Int(duration_s)] = values
        else {
            return Err("job row does not match the schema".to_string());
        };
        let status = JobStatus::parse(status).ok_or_else(|| format!("unknown status '{status}'"))?;
        Ok(JobRun {
            job: job.clone(),
            timestamp: *timestamp,
            status,
            duration_s: *duration_s,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.job.clone()),
            Value::DateTime(self.timestamp),
            Value::Text(self.status.as_str().to_string()),
            Value::Int(self.duration_s),
        ]
    }
}

impl Record for ProductMetric {
    const FAMILY: RecordFamily = RecordFamily::ProductMetrics;
    const COLUMNS: &'static [ColumnSpec] = PRODUCT_COLUMNS;

    fn from_values(values: &[Value]) -> Result<Self, String> {
        let [
            Value::Date(date),
            Value::Text(product),
            Value::Int(applications),
            Value::Int(approvals),
            Value::Int(conversions),
            Value::Float(eligibility_rate),
        ] = values
        else {
            return Err("product row does not match the schema".to_string());
        };
        Ok(ProductMetric {
            date: *date,
            product: product.clone(),
            applications: *applications,
            approvals: *approvals,
            conversions: *conversions,
            eligibility_rate: *eligibility_rate,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Date(self.date),
            Value::Text(self.product.clone()),
            Value::Int(self.applications),
            Value::Int(self.approvals),
            Value::Int(self.conversions),
            Value::Float(self.eligibility_rate),
        ]
    }
}

/// Untyped tables for all three families, as delivered by a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    pub tickets: RawTable,
    pub jobs: RawTable,
    pub product_metrics: RawTable,
}

impl RawDataset {
    pub fn table_mut(&mut self, family: RecordFamily) -> &mut RawTable {
        match family {
            RecordFamily::Tickets => &mut self.tickets,
            RecordFamily::Jobs => &mut self.jobs,
            RecordFamily::ProductMetrics => &mut self.product_metrics,
        }
    }

    /// Coerce timestamp/date columns to their canonical temporal types.
    ///
    /// Cells that cannot be parsed are left for the validator to report.
    pub fn normalize_temporal_columns(&mut self) {
        self.tickets.normalize_column("timestamp", ColumnKind::DateTime);
        self.jobs.normalize_column("timestamp", ColumnKind::DateTime);
        self.product_metrics.normalize_column("date", ColumnKind::Date);
    }
}

pub fn validate_tickets(table: &RawTable) -> Result<Vec<Ticket>, AppError> {
    Ok(validate_table(table)?)
}

pub fn validate_jobs(table: &RawTable) -> Result<Vec<JobRun>, AppError> {
    Ok(validate_table(table)?)
}

pub fn validate_product_metrics(table: &RawTable) -> Result<Vec<ProductMetric>, AppError> {
    Ok(validate_table(table)?)
}

/// Validate all three families; violations from every family are reported together.
pub fn validate_dataset(raw: &RawDataset) -> Result<DataSource, AppError> {
    let tickets = validate_table::<Ticket>(&raw.tickets);
    let jobs = validate_table::<JobRun>(&raw.jobs);
    let product_metrics = validate_table::<ProductMetric>(&raw.product_metrics);
    finish(tickets, jobs, product_metrics, absent_facets(&raw.tickets))
}

/// Facet columns missing from a raw ticket table.
pub fn absent_facets(tickets: &RawTable) -> BTreeSet<Facet> {
    Facet::ALL
        .into_iter()
        .filter(|facet| tickets.column_index(facet.column()).is_none())
        .collect()
}

/// Run the schema over an already typed dataset (e.g. generated data).
pub fn validate_source(data: &DataSource) -> Result<DataSource, AppError> {
    let tickets = revalidate(&data.tickets);
    let jobs = revalidate(&data.jobs);
    let product_metrics = revalidate(&data.product_metrics);
    finish(tickets, jobs, product_metrics, data.absent_facets.clone())
}

fn finish(
    tickets: Result<Vec<Ticket>, SchemaViolations>,
    jobs: Result<Vec<JobRun>, SchemaViolations>,
    product_metrics: Result<Vec<ProductMetric>, SchemaViolations>,
    absent_facets: BTreeSet<Facet>,
) -> Result<DataSource, AppError> {
    match (tickets, jobs, product_metrics) {
        (Ok(tickets), Ok(jobs), Ok(product_metrics)) => {
            let data = DataSource {
                tickets,
                jobs,
                product_metrics,
                absent_facets,
            };
            for (family, rows) in data.row_counts() {
                info!(%family, rows, "schema validation passed");
            }
            Ok(data)
        }
        (tickets, jobs, product_metrics) => {
            let mut all = SchemaViolations::default();
            for result in [tickets.err(), jobs.err(), product_metrics.err()].into_iter().flatten() {
                all.extend(result);
            }
            Err(AppError::SchemaValidation(all))
        }
    }
}
