//! Database access for lpi-ingest
//!
//! Table creation lives in `lpi_common::db`; this module owns the row-level
//! operations of the import pipeline.

pub mod profiles;

pub use profiles::{
    get_profile_by_user, AuditEntry, PersistedProfileRecord, ProfileSink, SqliteProfileSink,
};
