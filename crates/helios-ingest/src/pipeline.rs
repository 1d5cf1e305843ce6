//! Ingestion pipeline
//!
//! One `process_line` call takes a raw CDR line all the way to a committed
//! record: parse, classify the dialed number, match the tenant's patterns,
//! compute the cost, settle the caller's quota, and insert the record.
//!
//! The quota deduction and the record insert succeed or fail together: the
//! deduction runs first under the per-extension guard, and if the insert
//! then fails the deduction is credited straight back before the error
//! propagates. A rejected deduction is not an error; the record is
//! persisted with the `quota_exceeded` flag so the overdraft is never
//! silent.

use chrono::Utc;
use helios_core::{
    models::CallRecord,
    traits::{CallRecordRepository, PatternRepository, QuotaRepository},
    AppResult,
};
use helios_rating::{
    calculate_cost, match_number, CountryClassifier, LedgerOutcome, QuotaLedger,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::parser::parse_line;

/// The full parse-to-commit pipeline over abstract repositories
pub struct IngestPipeline<C, P, Q>
where
    C: CallRecordRepository,
    P: PatternRepository,
    Q: QuotaRepository,
{
    record_repo: Arc<C>,
    pattern_repo: Arc<P>,
    ledger: Arc<QuotaLedger<Q>>,
    classifier: CountryClassifier,
    default_tenant_id: i64,
}

impl<C, P, Q> IngestPipeline<C, P, Q>
where
    C: CallRecordRepository,
    P: PatternRepository,
    Q: QuotaRepository,
{
    pub fn new(
        record_repo: Arc<C>,
        pattern_repo: Arc<P>,
        ledger: Arc<QuotaLedger<Q>>,
        classifier: CountryClassifier,
        default_tenant_id: i64,
    ) -> Self {
        Self {
            record_repo,
            pattern_repo,
            ledger,
            classifier,
            default_tenant_id,
        }
    }

    /// Process one raw CDR line end to end
    #[instrument(skip(self, line))]
    pub async fn process_line(&self, line: &str) -> AppResult<CallRecord> {
        let mut draft = parse_line(line, Utc::now().date_naive())?;

        let tenant_id = draft.tenant_id.unwrap_or(self.default_tenant_id);
        draft.tenant_id = Some(tenant_id);

        // Derivation happens exactly once, here. Updates later in the
        // record's life go through the explicit re-rate job.
        draft.country = self.classifier.classify(&draft.callee).to_string();

        let patterns = self.pattern_repo.list_for_tenant(tenant_id).await?;
        let matched = match_number(&patterns, &draft.callee);
        draft.call_category = matched.category;
        draft.call_rate = matched.rate;
        draft.total_cost = calculate_cost(draft.duration, matched.rate);

        debug!(
            callee = %draft.callee,
            country = %draft.country,
            category = %draft.call_category,
            cost = %draft.total_cost,
            "draft rated"
        );

        let mut deducted = Decimal::ZERO;
        if let Some(caller) = draft.caller.clone() {
            if draft.total_cost > Decimal::ZERO {
                match self
                    .ledger
                    .deduct(tenant_id, &caller, draft.total_cost)
                    .await?
                {
                    LedgerOutcome::Applied => deducted = draft.total_cost,
                    LedgerOutcome::Rejected { available } => {
                        warn!(
                            caller = %caller,
                            required = %draft.total_cost,
                            %available,
                            "quota exceeded, persisting flagged record"
                        );
                        draft.quota_exceeded = true;
                    }
                    LedgerOutcome::NoQuota => {
                        warn!(caller = %caller, "no quota ledger for caller");
                    }
                }
            }
        }

        match self.record_repo.create(&draft).await {
            Ok(record) => {
                info!(record_id = record.id, "call record committed");
                Ok(record)
            }
            Err(e) => {
                // Undo the deduction so the failed insert leaves no trace.
                if deducted > Decimal::ZERO {
                    let caller = draft.caller.as_deref().unwrap_or_default();
                    if let Err(credit_err) = self.ledger.credit(tenant_id, caller, deducted).await
                    {
                        error!(
                            caller,
                            amount = %deducted,
                            "failed to roll back quota deduction: {}",
                            credit_err
                        );
                    }
                }
                Err(e)
            }
        }
    }
}
