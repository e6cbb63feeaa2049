/// Enrichment pipeline shared by the CLI and tests.
///
/// One pass works through pending leads sequentially:
/// 1. Fetch leads with a successful call and no extraction yet
/// 2. Skip leads with an empty transcript
/// 3. Extract fields (cache first, then provider behind a circuit breaker)
/// 4. Score the lead
/// 5. Store fields and score
use crate::circuit_breaker::create_extraction_circuit_breaker;
use crate::errors::{AppError, ResultExt};
use crate::extraction::ExtractionProvider;
use crate::extraction_cache::ExtractionCache;
use crate::models::{ExtractedFields, PendingLead};
use crate::scoring::compute_score;
use async_trait::async_trait;
use failsafe::CircuitBreaker;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Storage the pipeline reads pending leads from and writes results to.
#[async_trait]
pub trait EnrichmentStore: Send + Sync {
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<PendingLead>, AppError>;

    async fn save_enrichment(
        &self,
        id: Uuid,
        fields: &ExtractedFields,
        score: u8,
    ) -> Result<(), AppError>;
}

/// Counters for one enrichment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EnrichmentResult {
    /// Pending leads returned by the store.
    pub fetched: usize,
    /// Leads extracted, scored and saved.
    pub processed: usize,
    /// Leads skipped for having no transcript.
    pub skipped: usize,
    /// Leads whose extraction failed.
    pub failed: usize,
    /// Extractions served from the cache.
    pub cache_hits: usize,
    /// The pass stopped early because the circuit breaker opened.
    pub aborted: bool,
}

impl fmt::Display for EnrichmentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} fetched, {} processed, {} skipped, {} failed, {} cache hit(s)",
            if self.aborted { "aborted by open circuit" } else { "complete" },
            self.fetched,
            self.processed,
            self.skipped,
            self.failed,
            self.cache_hits
        )
    }
}

pub struct EnrichmentPipeline<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
    cache: ExtractionCache,
}

impl<S, P> EnrichmentPipeline<S, P>
where
    S: EnrichmentStore,
    P: ExtractionProvider,
{
    pub fn new(store: Arc<S>, provider: Arc<P>, cache_ttl: Duration) -> Self {
        Self {
            store,
            provider,
            cache: ExtractionCache::new(cache_ttl),
        }
    }

    /// Runs one pass over at most `limit` pending leads.
    ///
    /// Extraction failures are counted and the pass continues; a storage
    /// failure ends the pass with an error.
    pub async fn run(&self, limit: i64) -> Result<EnrichmentResult, AppError> {
        let leads = self.store.fetch_pending(limit).await?;
        let breaker = create_extraction_circuit_breaker();

        let mut result = EnrichmentResult {
            fetched: leads.len(),
            ..Default::default()
        };
        tracing::info!("Starting enrichment pass: {} pending lead(s)", leads.len());

        for lead in leads {
            let transcript = lead.transcript.as_deref().unwrap_or("").trim();
            if transcript.is_empty() {
                tracing::debug!("Skipping lead {}: empty transcript", lead.id);
                result.skipped += 1;
                continue;
            }

            let extracted = if let Some(cached) = self.cache.get(transcript).await {
                tracing::debug!("Extraction cache hit for lead {}", lead.id);
                result.cache_hits += 1;
                cached
            } else {
                if !breaker.is_call_permitted() {
                    tracing::error!(
                        "Extraction circuit open, stopping pass after {} processed",
                        result.processed
                    );
                    result.aborted = true;
                    break;
                }

                let outcome = self.provider.extract(transcript).await;
                match breaker.call(move || outcome) {
                    Ok(fields) => {
                        self.cache.insert(transcript, &fields).await;
                        fields
                    }
                    Err(failsafe::Error::Inner(e)) => {
                        tracing::warn!("Extraction failed for lead {}: {}", lead.id, e);
                        result.failed += 1;
                        continue;
                    }
                    Err(failsafe::Error::Rejected) => {
                        result.aborted = true;
                        break;
                    }
                }
            };

            let score = compute_score(&extracted, lead.call_successful, lead.needs_recall);
            self.store
                .save_enrichment(lead.id, &extracted, score)
                .await
                .with_context(|| format!("enrichment pass stopped at lead {}", lead.id))?;

            tracing::info!("✓ Lead {} scored {}", lead.id, score);
            result.processed += 1;
        }

        tracing::info!("Enrichment pass {}", result);

        Ok(result)
    }
}
