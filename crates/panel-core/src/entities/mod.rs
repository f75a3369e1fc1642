//! Entity structs for all Panel domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `panel-db/migrations/001_initial.sql`). All structs derive `Serialize`,
//! `Deserialize`, and `JsonSchema` for JSON roundtrip and schema validation.

mod assignment;
mod audit;
mod item;
mod user;

pub use assignment::{ReviewAssignment, ReviewNarrative};
pub use audit::AuditEntry;
pub use item::{ItemContent, RevisionNote, ReviewedItem};
pub use user::UserSummary;
