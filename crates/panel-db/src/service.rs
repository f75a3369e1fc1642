//! Service layer orchestrating database mutations with the audit trail.
//!
//! `PanelService` wraps `PanelDb` together with the selection settings and the
//! random source used by automatic reviewer assignment. All workflow
//! operations are implemented as `impl PanelService` blocks in `repos/`.

use panel_config::SelectionConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, MutexGuard};

use crate::PanelDb;
use crate::error::DatabaseError;

/// Orchestrates database mutations with audit trail.
///
/// Every mutation method follows this protocol:
/// 1. Take the write gate
/// 2. Begin an immediate transaction
/// 3. Read, check, and compare-and-swap on `status`
/// 4. Append audit entries (inside the transaction)
/// 5. Commit, or roll back on any error
///
/// The write gate serializes mutations within the process, so `finalize`
/// always sees a stable set of assignments for an item.
pub struct PanelService {
    db: PanelDb,
    selection: SelectionConfig,
    rng: Mutex<StdRng>,
    write_gate: Mutex<()>,
}

impl PanelService {
    /// Create a new service over a local database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str, selection: SelectionConfig) -> Result<Self, DatabaseError> {
        let db = PanelDb::open_local(db_path).await?;
        Ok(Self::from_db(db, selection))
    }

    /// Create from an existing `PanelDb`.
    #[must_use]
    pub fn from_db(db: PanelDb, selection: SelectionConfig) -> Self {
        Self {
            db,
            selection,
            rng: Mutex::new(StdRng::from_entropy()),
            write_gate: Mutex::new(()),
        }
    }

    /// Replace the random source with a seeded one for reproducible selection.
    #[must_use]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &PanelDb {
        &self.db
    }

    #[must_use]
    pub const fn selection(&self) -> &SelectionConfig {
        &self.selection
    }

    pub(crate) async fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().await
    }

    /// Wait for exclusive write access.
    pub(crate) async fn write_gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    pub(crate) async fn begin(&self) -> Result<libsql::Transaction, DatabaseError> {
        Ok(self
            .db
            .conn()
            .transaction_with_behavior(libsql::TransactionBehavior::Immediate)
            .await?)
    }

    /// Commit on success, roll back on failure.
    pub(crate) async fn finish<T>(
        tx: libsql::Transaction,
        result: Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(%rollback, "rollback failed after {error}");
                }
                Err(error)
            }
        }
    }
}
