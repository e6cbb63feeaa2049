use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lead_ai::config::Config;
use lead_ai::db::Database;
use lead_ai::db_storage::LeadStore;
use lead_ai::enrichment::EnrichmentPipeline;
use lead_ai::extraction::OpenAiExtractor;
use lead_ai::models::{ExtractedFields, Handover, Label, LeadFilter, NewLead};
use lead_ai::scoring::{compute_score, LeadSummary, ScoreTier};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "lead-ai",
    about = "Import, enrich and score car-seller leads from call transcripts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply database migrations
    Migrate,
    /// Upsert leads from a JSON array of lead rows
    Import(ImportArgs),
    /// Extract fields and score pending leads
    Enrich(EnrichArgs),
    /// List leads by score, highest first
    List(ListArgs),
    /// Show a single lead
    Show {
        /// Lead id
        id: Uuid,
    },
    /// Score an extraction JSON file without touching the database
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Path to a JSON file containing an array of lead rows
    #[arg(long)]
    file: PathBuf,
}

#[derive(Args, Debug)]
struct EnrichArgs {
    /// Maximum number of leads to process (defaults to ENRICH_BATCH_LIMIT)
    #[arg(long)]
    limit: Option<i64>,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only leads scoring at least this much
    #[arg(long, default_value_t = 0)]
    min_score: i32,
    /// Only leads with this handover label, e.g. "immediate" or "1-2 weeks"
    #[arg(long)]
    handover: Option<String>,
    /// Only leads flagged for a recall
    #[arg(long)]
    recall_only: bool,
    /// Case-insensitive search over make, model, id and extracted labels
    #[arg(long)]
    search: Option<String>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Path to a JSON file with extracted fields
    #[arg(long)]
    file: PathBuf,
    /// Whether the call succeeded; omit when unknown
    #[arg(long)]
    call_successful: Option<bool>,
    /// Flag the lead for a recall
    #[arg(long)]
    needs_recall: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_ai=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Score(args) => score_file(&args)?,
        Command::Migrate => {
            let (_, db) = connect().await?;
            db.migrate().await?;
            tracing::info!("Migrations applied");
        }
        Command::Import(args) => {
            let raw = tokio::fs::read_to_string(&args.file)
                .await
                .with_context(|| format!("reading {}", args.file.display()))?;
            let rows: Vec<NewLead> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", args.file.display()))?;

            let (_, db) = connect().await?;
            let store = LeadStore::new(db.pool.clone());
            let result = store.upsert_leads(&rows).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Enrich(args) => {
            let (config, db) = connect().await?;
            let limit = args.limit.unwrap_or(config.enrich_batch_limit);
            if limit <= 0 {
                anyhow::bail!("--limit must be a positive number");
            }

            let provider = OpenAiExtractor::new(&config)?;
            tracing::info!("Extraction provider ready (model: {})", provider.model());

            let pipeline = EnrichmentPipeline::new(
                Arc::new(LeadStore::new(db.pool.clone())),
                Arc::new(provider),
                Duration::from_secs(config.extraction_cache_ttl_secs),
            );
            let result = pipeline.run(limit).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::List(args) => {
            let handover = args
                .handover
                .as_deref()
                .map(|label| {
                    Handover::parse_known(label.trim().to_lowercase().as_str())
                        .ok_or_else(|| anyhow::anyhow!("unknown handover label: {}", label))
                })
                .transpose()?;

            let filter = LeadFilter {
                min_score: args.min_score,
                handover,
                recall_only: args.recall_only,
                search: args.search,
            };

            let (_, db) = connect().await?;
            let store = LeadStore::new(db.pool.clone());
            let leads = store.list_leads(&filter).await?;

            for lead in &leads {
                println!(
                    "{:>3}  {:<4}  {}  {} {} {}{}",
                    lead.score,
                    ScoreTier::from_score(lead.score).as_str(),
                    lead.id,
                    lead.make.as_deref().unwrap_or("Unknown"),
                    lead.model.as_deref().unwrap_or("Car"),
                    lead.year.map(|y| format!("({})", y)).unwrap_or_default(),
                    if lead.needs_recall { "  [needs recall]" } else { "" }
                );
            }

            let summary = LeadSummary::from_leads(&leads);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Show { id } => {
            let (_, db) = connect().await?;
            let store = LeadStore::new(db.pool.clone());
            let lead = store.get_lead(id).await?;
            println!("{}", serde_json::to_string_pretty(&lead)?);
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<(Config, Database)> {
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let db = Database::new(config.require_database_url()?).await?;
    tracing::info!("Database connection pool established");

    Ok((config, db))
}

fn score_file(args: &ScoreArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let fields: ExtractedFields = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.file.display()))?;

    let score = compute_score(&fields, args.call_successful, args.needs_recall);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "score": score,
            "tier": ScoreTier::from_score(i32::from(score)),
            "fields": fields,
        }))?
    );

    Ok(())
}
