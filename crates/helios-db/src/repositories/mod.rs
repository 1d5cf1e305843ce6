//! Repository implementations

pub mod call_record_repo;
pub mod extension_repo;
pub mod pattern_repo;
pub mod quota_repo;

pub use call_record_repo::PgCallRecordRepository;
pub use extension_repo::PgExtensionRepository;
pub use pattern_repo::PgPatternRepository;
pub use quota_repo::PgQuotaRepository;
