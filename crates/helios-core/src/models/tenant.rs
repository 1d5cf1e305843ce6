//! Tenant and extension models
//!
//! A tenant is the customer boundary: call patterns, quotas, and extensions
//! are always scoped to one tenant. Extensions are the internal lines whose
//! outbound calls get rated and charged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique identifier
    pub id: i64,

    /// Tenant display name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Extension entity
///
/// One internal line within a tenant. The extension string is what shows up
/// as the caller field of a CDR; call records reference it by string match,
/// not by foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extension {
    /// Unique identifier
    pub id: i64,

    /// Owning tenant
    pub tenant_id: i64,

    /// Extension number, e.g. "1001"
    pub extension: String,

    /// Display name of the person/desk behind the extension
    pub name: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
