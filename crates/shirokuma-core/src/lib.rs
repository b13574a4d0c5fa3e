//! # Shirokuma Core
//!
//! Knowledge-base engine for AI agents. One universal item record (issues,
//! plans, docs, knowledge, sessions, dailies, specs, decisions, ...) stored
//! in embedded SQLite and enriched on write with derived metadata:
//!
//! - **Enrichment pipeline**: weighted keywords, weighted concepts, a
//!   bounded summary, and a quantized 128-dim embedding, recomputed only
//!   when title/description/content change
//! - **Hybrid related items**: keyword overlap + concept overlap +
//!   embedding cosine fused into one ranked result, or plain graph BFS
//! - **Structured search**: `status:Open type:issue date:2025-01-01..`
//!   tokens over case-insensitive substring matching
//! - **System state**: an at-most-one-active history row for session
//!   continuity, with graph metrics snapshots
//! - **File mirror**: best-effort Markdown tree under
//!   `SHIROKUMA_EXPORT_DIR`, written after commit, never blocking a write
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shirokuma_core::{Config, CreateItemInput, Store};
//!
//! let store = Store::open(&Config::from_env()?)?;
//!
//! let item = store.create_item(CreateItemInput {
//!     content: "Getting TypeError when calling undefined function".into(),
//!     tags: vec!["javascript".into(), "bug".into()],
//!     ..CreateItemInput::new("issue", "Search test: JavaScript error")
//! })?;
//!
//! let hits = store.search_items("status:Open javascript", &Default::default())?;
//! let related = store.get_related_items(item.id, &Default::default())?;
//! ```

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod enrich;
pub mod error;
pub mod items;
pub mod mirror;
pub mod related;
pub mod search;
pub mod state;
pub mod stats;
pub mod storage;
pub mod version;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use config::Config;
pub use error::{Result, ServiceError};
pub use storage::Store;

pub use items::{
    AddRelationsResult, CreateItemInput, Item, ItemSummary, ListItemsParams, Priority, SortBy,
    SortOrder, Status, UpdateItemInput, WeightedConcept, WeightedKeyword, DEFAULT_STATUS,
    DEFAULT_STATUSES, MAX_TITLE_LEN,
};

pub use enrich::{
    cosine_similarity, dequantize, quantize, Enrichment, EnrichmentParts, EnrichmentProvider,
    EnrichmentService, LexicalProvider, ProviderError, EMBEDDING_DIMENSIONS,
};

pub use related::{
    HybridWeights, RelatedEdge, RelatedItem, RelatedParams, RelatedResult, Strategy, Thresholds,
    DEFAULT_RELATED_LIMIT,
};

pub use search::SearchParams;

pub use state::{StateMetrics, SystemState, UpdateStateInput};

pub use stats::{KeyCount, Stats, TagCount};

pub use version::{denormalize_version, normalize_version};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
