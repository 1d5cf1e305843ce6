//! Helios CDR Database Layer
//!
//! PostgreSQL-backed implementations of the repository traits defined in
//! `helios-core`:
//!
//! - Connection pool management with sqlx
//! - Call record, pattern, quota, and extension repositories
//! - Balance-guarded atomic quota updates (the row-level half of the
//!   ledger's concurrency contract)
//! - Transactional extension provisioning

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use helios_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
