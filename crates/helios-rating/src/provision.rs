//! Extension provisioning
//!
//! Creating an extension and its quota ledger is one explicit, transactional
//! application-service call. There is no implicit hook that conjures a
//! ledger behind the caller's back; anything that wants an extension goes
//! through here.

use helios_core::{
    models::{Extension, UserQuota},
    traits::ExtensionRepository,
    AppResult,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Provisioning service over the extension repository
pub struct ProvisioningService<E: ExtensionRepository> {
    extension_repo: Arc<E>,
}

impl<E: ExtensionRepository> ProvisioningService<E> {
    pub fn new(extension_repo: Arc<E>) -> Self {
        Self { extension_repo }
    }

    /// Create an extension together with its quota ledger
    ///
    /// The ledger is seeded from the tenant's default quota by the
    /// repository, inside one transaction: either both rows exist
    /// afterwards or neither does.
    #[instrument(skip(self))]
    pub async fn provision_extension(
        &self,
        tenant_id: i64,
        extension: &str,
        name: Option<&str>,
    ) -> AppResult<(Extension, UserQuota)> {
        let (ext, quota) = self
            .extension_repo
            .provision(tenant_id, extension, name)
            .await?;

        info!(
            tenant_id,
            extension,
            user_quota_id = quota.id,
            initial_balance = %quota.remaining_balance,
            "provisioned extension with quota ledger"
        );

        Ok((ext, quota))
    }
}
