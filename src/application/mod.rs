//! Application layer - Use cases and orchestration.
//!
//! This module contains application services that orchestrate domain logic
//! and infrastructure. Services depend on domain ports (traits) rather than
//! concrete implementations.

pub mod services;

pub use services::{
    CorruptIndexPolicy, DocumentService, FaithfulnessEvaluator, IndexOrigin, IndexService,
    QueryEngine, QuerySettings, RagService, RelevancyEvaluator, VectorIndex, VectorStoreFactory,
    DEFAULT_FAITHFULNESS_TEMPLATE, DEFAULT_RELEVANCY_TEMPLATE, DEFAULT_TEXT_QA_TEMPLATE,
};
