//! Lead AI Library
//!
//! Scores car-seller leads from call transcripts: call outcome
//! classification, field extraction through a hosted language model,
//! the lead score itself, and PostgreSQL storage for the results.
//!
//! # Modules
//!
//! - `core`: Scoring, call outcomes, models and errors.
//! - `data`: Data access layer.
//! - `integrations`: External service integrations.
//! - `call_outcome`: Call status and recall flag derivation.
//! - `circuit_breaker`: Circuit breaker for extraction calls.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Lead storage operations.
//! - `enrichment`: Enrichment pipeline.
//! - `errors`: Error handling types.
//! - `extraction`: Extraction provider trait and chat completions client.
//! - `extraction_cache`: Checksummed cache of extraction results.
//! - `models`: Core data models.
//! - `prompt`: Extraction prompt text.
//! - `scoring`: Lead score, tiers and summaries.

pub mod core;
pub mod data;
pub mod integrations;

pub mod call_outcome;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod enrichment;
pub mod errors;
pub mod extraction;
pub mod extraction_cache;
pub mod models;
pub mod prompt;
pub mod scoring;
