//! Repository modules implementing Panel's operations.
//!
//! Each module adds methods to `PanelService` via `impl PanelService` blocks.
//! Methods ending in `_in` run on a caller-supplied connection or transaction
//! and never take the write gate; the public wrappers do.

pub mod assignment;
pub mod audit;
pub mod consensus;
pub mod directory;
pub mod item;
pub mod lifecycle;
pub mod review;
pub mod selector;
pub mod stats;
