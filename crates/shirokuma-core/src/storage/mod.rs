//! Relational persistence.
//!
//! Single-file SQLite store with foreign-key enforcement, versioned
//! migrations, and a busy-retrying transaction helper.

pub mod migrations;
mod sqlite;

pub use sqlite::Store;

pub(crate) use sqlite::{
    clear_enrichment_joins, delete_relation_pair, ensure_tags, insert_enrichment_joins,
    insert_relation_pair, item_embedding, item_exists, item_tag_names, lookup_status_id,
    read_item, related_ids, status_id,
};
