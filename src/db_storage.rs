use crate::call_outcome::CallStatus;
use crate::enrichment::EnrichmentStore;
use crate::errors::{AppError, ResultExt};
use crate::models::{
    CallOutcome, ExtractedFields, ImportResult, Label, Lead, LeadFilter, LeadListItem, NewLead,
    PendingLead,
};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::json;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

const LEAD_COLUMNS: &str = r#"
    id, external_id, first_name, last_name, make, model, year, mileage,
    price_estimation::float8 AS price_estimation, status,
    call_successful, call_outcome, needs_recall, transcript,
    asking_price::float8 AS asking_price, willingness_to_negotiate,
    expected_handover_date, car_condition, number_of_owners, user_sentiment,
    extraction_json, confidence, score, extracted_at, created_at
"#;

/// PostgreSQL storage for leads.
#[derive(Clone)]
pub struct LeadStore {
    pool: PgPool,
}

impl LeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update imported leads keyed by `external_id`.
    ///
    /// Rows without an external id are dropped. Call outcome and recall flag
    /// are derived from the call result and transcript. Extracted fields and
    /// scores of existing rows are left untouched.
    pub async fn upsert_leads(&self, rows: &[NewLead]) -> Result<ImportResult, AppError> {
        let keyed: Vec<&NewLead> = rows
            .iter()
            .filter(|row| {
                row.external_id
                    .as_deref()
                    .is_some_and(|id| !id.trim().is_empty())
            })
            .collect();

        if keyed.len() < rows.len() {
            tracing::warn!(
                "Skipping {} row(s) without external_id",
                rows.len() - keyed.len()
            );
        }

        let mut tx = self.pool.begin().await.context("starting import transaction")?;
        let mut upserted = 0;

        for row in &keyed {
            let (outcome, status): (CallOutcome, CallStatus) =
                CallOutcome::from_call(row.transcript.as_deref(), row.call_successful);

            let result = sqlx::query(
                r#"
                INSERT INTO leads (
                    external_id, first_name, last_name, make, model, year, mileage,
                    price_estimation, status, call_successful, call_outcome, needs_recall, transcript
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (external_id) DO UPDATE SET
                    first_name = EXCLUDED.first_name,
                    last_name = EXCLUDED.last_name,
                    make = EXCLUDED.make,
                    model = EXCLUDED.model,
                    year = EXCLUDED.year,
                    mileage = EXCLUDED.mileage,
                    price_estimation = EXCLUDED.price_estimation,
                    status = EXCLUDED.status,
                    call_successful = EXCLUDED.call_successful,
                    call_outcome = EXCLUDED.call_outcome,
                    needs_recall = EXCLUDED.needs_recall,
                    transcript = EXCLUDED.transcript
                "#,
            )
            .bind(row.external_id.as_deref().map(str::trim))
            .bind(&row.first_name)
            .bind(&row.last_name)
            .bind(&row.make)
            .bind(&row.model)
            .bind(row.year)
            .bind(row.mileage)
            .bind(row.price_estimation.and_then(to_decimal))
            .bind(&row.status)
            .bind(outcome.call_successful)
            .bind(status.as_str())
            .bind(outcome.needs_recall)
            .bind(&row.transcript)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("upserting lead {:?}", row.external_id))?;

            upserted += result.rows_affected() as usize;
        }

        tx.commit().await.context("committing import transaction")?;

        tracing::info!("Imported {} lead(s), {} upserted", keyed.len(), upserted);

        Ok(ImportResult {
            imported: keyed.len(),
            upserted,
        })
    }

    /// Leads with a successful call that have not been extracted yet.
    pub async fn fetch_pending(&self, limit: i64) -> Result<Vec<PendingLead>, AppError> {
        let leads = sqlx::query_as::<_, PendingLead>(
            r#"
            SELECT id, transcript, call_successful, needs_recall
            FROM leads
            WHERE call_successful = true AND extracted_at IS NULL
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("fetching leads pending extraction")?;

        Ok(leads)
    }

    /// Persist extracted fields and score, and mark the lead as extracted.
    pub async fn save_enrichment(
        &self,
        id: Uuid,
        fields: &ExtractedFields,
        score: u8,
    ) -> Result<(), AppError> {
        let extraction_json = serde_json::to_value(fields)?;
        let confidence = fields.confidence.as_ref().map(|c| json!(c));

        let result = sqlx::query(
            r#"
            UPDATE leads SET
                asking_price = $2,
                willingness_to_negotiate = $3,
                expected_handover_date = $4,
                car_condition = $5,
                number_of_owners = $6,
                user_sentiment = $7,
                extraction_json = $8,
                confidence = $9,
                score = $10,
                extracted_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(fields.asking_price.and_then(to_decimal))
        .bind(fields.willingness_to_negotiate.as_str())
        .bind(fields.expected_handover_date.as_str())
        .bind(fields.car_condition.as_str())
        .bind(fields.number_of_owners.map(|n| i32::try_from(n).unwrap_or(i32::MAX)))
        .bind(fields.user_sentiment.as_str())
        .bind(extraction_json)
        .bind(confidence)
        .bind(i32::from(score))
        .execute(&self.pool)
        .await
        .with_context(|| format!("saving enrichment for lead {}", id))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead with id {} not found", id)));
        }

        Ok(())
    }

    /// List leads ordered by score, highest first.
    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<LeadListItem>, AppError> {
        let leads = sqlx::query_as::<_, LeadListItem>(
            r#"
            SELECT id, external_id, make, model, year,
                   price_estimation::float8 AS price_estimation,
                   call_successful, needs_recall,
                   asking_price::float8 AS asking_price,
                   willingness_to_negotiate, expected_handover_date, car_condition,
                   user_sentiment, score, created_at
            FROM leads
            WHERE ($1::int4 IS NULL OR score >= $1)
              AND ($2::text IS NULL OR expected_handover_date = $2)
              AND (NOT $3::bool OR needs_recall)
              AND ($4::text IS NULL
                   OR make ILIKE $4
                   OR model ILIKE $4
                   OR external_id ILIKE $4
                   OR willingness_to_negotiate ILIKE $4
                   OR car_condition ILIKE $4
                   OR user_sentiment ILIKE $4
                   OR ($5::float8 IS NOT NULL
                       AND (year = $5 OR asking_price = $5 OR score = $5)))
            ORDER BY score DESC, created_at DESC
            "#,
        )
        .bind(filter.min_score_bound())
        .bind(filter.handover.map(|h| h.as_str()))
        .bind(filter.recall_only)
        .bind(filter.search_pattern())
        .bind(filter.numeric_term())
        .fetch_all(&self.pool)
        .await
        .context("listing leads")?;

        Ok(leads)
    }

    pub async fn get_lead(&self, id: Uuid) -> Result<Lead, AppError> {
        let query = format!("SELECT {} FROM leads WHERE id = $1", LEAD_COLUMNS);
        sqlx::query_as::<_, Lead>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("loading lead {}", id))?
            .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", id)))
    }
}

#[async_trait]
impl EnrichmentStore for LeadStore {
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<PendingLead>, AppError> {
        LeadStore::fetch_pending(self, limit).await
    }

    async fn save_enrichment(
        &self,
        id: Uuid,
        fields: &ExtractedFields,
        score: u8,
    ) -> Result<(), AppError> {
        LeadStore::save_enrichment(self, id, fields, score).await
    }
}

fn to_decimal(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}
