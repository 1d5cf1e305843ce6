//! Domain models for Helios CDR

pub mod call_record;
pub mod pattern;
pub mod quota;
pub mod tenant;

pub use call_record::{CallRecord, CallRecordDraft, RouteLeg, Routing};
pub use pattern::{CallCategory, CallPattern};
pub use quota::{Quota, UserQuota};
pub use tenant::{Extension, Tenant};
