//! Helios CDR rating services
//!
//! The in-memory business logic between the line parser and the repository:
//!
//! - Country/number classification against a static calling-code table
//! - First-match-wins pattern matching over tenant pattern lists
//! - Duration-rounded cost calculation in fixed-point arithmetic
//! - The per-extension quota ledger with monthly resets
//! - Extension provisioning and the explicit re-rate batch job
//!
//! Classification, matching, and rating are pure functions; only the ledger
//! and the batch job touch repositories.

pub mod country;
pub mod ledger;
pub mod matcher;
pub mod provision;
pub mod rating;
pub mod rerate;

pub use country::{CountryClassifier, NumberClass};
pub use ledger::{LedgerOutcome, QuotaLedger};
pub use matcher::{match_number, PatternMatch};
pub use provision::ProvisioningService;
pub use rating::{billable_minutes, calculate_cost};
pub use rerate::{RerateJob, RerateSummary};
