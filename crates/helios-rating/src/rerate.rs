//! Explicit re-rate batch job
//!
//! Rated fields are computed once at record creation. When an operator edits
//! a tenant's patterns, nothing recomputes on its own: this job is the
//! auditable path that walks the tenant's records, re-derives
//! country/category/rate/cost from the current pattern list, and settles
//! each extension's ledger by the cost delta rather than the full new cost,
//! so no call is ever double-charged.

use helios_core::{
    models::CallRecord,
    traits::{CallRecordRepository, PatternRepository, QuotaRepository},
    AppResult,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::country::CountryClassifier;
use crate::ledger::{LedgerOutcome, QuotaLedger};
use crate::matcher::match_number;
use crate::rating::calculate_cost;

/// Page size for walking a tenant's records
const RERATE_BATCH_SIZE: i64 = 500;

/// What a re-rate run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RerateSummary {
    pub records_examined: u64,
    pub records_changed: u64,
    pub charges_applied: u64,
    pub credits_applied: u64,
    pub charges_rejected: u64,
}

/// Re-rate batch job over abstract repositories
pub struct RerateJob<C, P, Q>
where
    C: CallRecordRepository,
    P: PatternRepository,
    Q: QuotaRepository,
{
    record_repo: Arc<C>,
    pattern_repo: Arc<P>,
    ledger: Arc<QuotaLedger<Q>>,
    classifier: CountryClassifier,
}

impl<C, P, Q> RerateJob<C, P, Q>
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
    ) -> Self {
        Self {
            record_repo,
            pattern_repo,
            ledger,
            classifier,
        }
    }

    /// Re-rate every record of a tenant against its current pattern list
    #[instrument(skip(self))]
    pub async fn run(&self, tenant_id: i64) -> AppResult<RerateSummary> {
        let patterns = self.pattern_repo.list_for_tenant(tenant_id).await?;
        let mut summary = RerateSummary::default();
        let mut offset = 0;

        loop {
            let page = self
                .record_repo
                .list_for_tenant(tenant_id, RERATE_BATCH_SIZE, offset)
                .await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len() as i64;

            for record in page {
                summary.records_examined += 1;
                self.rerate_record(tenant_id, &record, &patterns, &mut summary)
                    .await?;
            }

            if page_len < RERATE_BATCH_SIZE {
                break;
            }
            offset += RERATE_BATCH_SIZE;
        }

        info!(
            tenant_id,
            examined = summary.records_examined,
            changed = summary.records_changed,
            "re-rate run finished"
        );
        Ok(summary)
    }

    async fn rerate_record(
        &self,
        tenant_id: i64,
        record: &CallRecord,
        patterns: &[helios_core::models::CallPattern],
        summary: &mut RerateSummary,
    ) -> AppResult<()> {
        let country = self.classifier.classify(&record.callee).to_string();
        let matched = match_number(patterns, &record.callee);
        let new_cost = calculate_cost(record.duration, matched.rate);

        let unchanged = record.call_category == matched.category
            && record.call_rate == matched.rate
            && record.total_cost == new_cost
            && record.country == country;
        if unchanged {
            return Ok(());
        }

        self.record_repo
            .update_rating(record.id, &country, matched.category, matched.rate, new_cost)
            .await?;
        summary.records_changed += 1;

        let Some(caller) = record.caller.as_deref() else {
            return Ok(());
        };

        match self
            .ledger
            .reconcile(tenant_id, caller, record.total_cost, new_cost)
            .await?
        {
            LedgerOutcome::Applied => {
                // A settled delta supersedes an earlier rejected charge.
                if record.quota_exceeded {
                    self.record_repo.set_quota_flag(record.id, false).await?;
                }
                if new_cost > record.total_cost {
                    summary.charges_applied += 1;
                } else if new_cost < record.total_cost {
                    summary.credits_applied += 1;
                }
            }
            LedgerOutcome::Rejected { available } => {
                warn!(
                    record_id = record.id,
                    caller,
                    %available,
                    "re-rate charge rejected, flagging record"
                );
                self.record_repo.set_quota_flag(record.id, true).await?;
                summary.charges_rejected += 1;
            }
            LedgerOutcome::NoQuota => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use helios_core::models::{
        CallCategory, CallPattern, CallRecordDraft, Routing, UserQuota,
    };
    use helios_core::AppError;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct MemoryRecords {
        rows: Mutex<Vec<CallRecord>>,
    }

    #[async_trait]
    impl CallRecordRepository for MemoryRecords {
        async fn create(&self, _draft: &CallRecordDraft) -> Result<CallRecord, AppError> {
            unreachable!("re-rate never creates records")
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<CallRecord>, AppError> {
            Ok(self.rows.lock().await.iter().find(|r| r.id == id).cloned())
        }

        async fn list_for_tenant(
            &self,
            tenant_id: i64,
            limit: i64,
            offset: i64,
        ) -> Result<Vec<CallRecord>, AppError> {
            Ok(self
                .rows
                .lock()
                .await
                .iter()
                .filter(|r| r.tenant_id == Some(tenant_id))
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn update_rating(
            &self,
            id: i64,
            country: &str,
            category: CallCategory,
            rate: Decimal,
            cost: Decimal,
        ) -> Result<CallRecord, AppError> {
            let mut rows = self.rows.lock().await;
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            row.country = country.to_string();
            row.call_category = category;
            row.call_rate = rate;
            row.total_cost = cost;
            Ok(row.clone())
        }

        async fn set_quota_flag(&self, id: i64, exceeded: bool) -> Result<(), AppError> {
            let mut rows = self.rows.lock().await;
            let row = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            row.quota_exceeded = exceeded;
            Ok(())
        }
    }

    struct MemoryPatterns {
        patterns: Vec<CallPattern>,
    }

    #[async_trait]
    impl PatternRepository for MemoryPatterns {
        async fn list_for_tenant(&self, _tenant_id: i64) -> Result<Vec<CallPattern>, AppError> {
            Ok(self.patterns.clone())
        }
    }

    struct MemoryQuotas {
        rows: Mutex<HashMap<i64, UserQuota>>,
    }

    #[async_trait]
    impl QuotaRepository for MemoryQuotas {
        async fn get_for_extension(
            &self,
            _tenant_id: i64,
            _extension: &str,
        ) -> Result<Option<UserQuota>, AppError> {
            Ok(self.rows.lock().await.get(&7).cloned())
        }

        async fn try_deduct(&self, id: i64, amount: Decimal) -> Result<bool, AppError> {
            let mut rows = self.rows.lock().await;
            let row = rows.get_mut(&id).unwrap();
            if row.remaining_balance >= amount {
                row.remaining_balance -= amount;
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn credit(&self, id: i64, amount: Decimal) -> Result<Decimal, AppError> {
            let mut rows = self.rows.lock().await;
            let row = rows.get_mut(&id).unwrap();
            row.remaining_balance += amount;
            Ok(row.remaining_balance)
        }

        async fn reset_balance(
            &self,
            id: i64,
            amount: Decimal,
            at: DateTime<Utc>,
        ) -> Result<(), AppError> {
            let mut rows = self.rows.lock().await;
            let row = rows.get_mut(&id).unwrap();
            row.remaining_balance = amount;
            row.last_reset = at;
            Ok(())
        }
    }

    fn record(id: i64, callee: &str, duration: i64, rate: Decimal, cost: Decimal) -> CallRecord {
        CallRecord {
            id,
            tenant_id: Some(1),
            caller: Some("1001".to_string()),
            callee: callee.to_string(),
            call_time: Utc::now(),
            external_number: callee.to_string(),
            duration: Some(duration),
            time_answered: None,
            time_end: None,
            reason_terminated: String::new(),
            reason_changed: String::new(),
            missed_queue_calls: String::new(),
            routing: Routing::default(),
            country: "Domestic Mobile".to_string(),
            call_category: CallCategory::Mobile,
            call_rate: rate,
            total_cost: cost,
            quota_exceeded: false,
            created_at: Utc::now(),
        }
    }

    fn pattern(raw: &str, category: CallCategory, rate: Decimal) -> CallPattern {
        CallPattern {
            id: 1,
            tenant_id: 1,
            pattern: raw.to_string(),
            call_type: category,
            rate_per_min: rate,
            description: None,
            position: 0,
        }
    }

    fn job(
        records: Vec<CallRecord>,
        patterns: Vec<CallPattern>,
        balance: Decimal,
    ) -> (
        RerateJob<MemoryRecords, MemoryPatterns, MemoryQuotas>,
        Arc<MemoryRecords>,
        Arc<MemoryQuotas>,
    ) {
        let record_repo = Arc::new(MemoryRecords {
            rows: Mutex::new(records),
        });
        let mut rows = HashMap::new();
        rows.insert(
            7,
            UserQuota {
                id: 7,
                extension_id: 1,
                quota_id: Some(1),
                quota_amount: Some(dec!(100.00)),
                remaining_balance: balance,
                last_reset: Utc::now(),
            },
        );
        let quota_repo = Arc::new(MemoryQuotas {
            rows: Mutex::new(rows),
        });
        let ledger = Arc::new(QuotaLedger::new(quota_repo.clone()));
        let job = RerateJob::new(
            record_repo.clone(),
            Arc::new(MemoryPatterns { patterns }),
            ledger,
            CountryClassifier::default(),
        );
        (job, record_repo, quota_repo)
    }

    #[tokio::test]
    async fn test_rerate_charges_delta_on_rate_increase() {
        // 90s at 0.50 was 1.00; the rate is now 2.00, so the record becomes
        // 4.00 and only the 3.00 difference is deducted.
        let (job, records, quotas) = job(
            vec![record(1, "0512345678", 90, dec!(0.50), dec!(1.00))],
            vec![pattern("05", CallCategory::Mobile, dec!(2.00))],
            dec!(50.00),
        );

        let summary = job.run(1).await.unwrap();
        assert_eq!(summary.records_examined, 1);
        assert_eq!(summary.records_changed, 1);
        assert_eq!(summary.charges_applied, 1);

        let updated = records.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(updated.total_cost, dec!(4.00));
        assert_eq!(updated.call_rate, dec!(2.00));
        assert_eq!(quotas.rows.lock().await[&7].remaining_balance, dec!(47.00));
    }

    #[tokio::test]
    async fn test_rerate_credits_delta_on_rate_decrease() {
        let (job, _, quotas) = job(
            vec![record(1, "0512345678", 90, dec!(2.00), dec!(4.00))],
            vec![pattern("05", CallCategory::Mobile, dec!(0.50))],
            dec!(50.00),
        );

        let summary = job.run(1).await.unwrap();
        assert_eq!(summary.credits_applied, 1);
        assert_eq!(quotas.rows.lock().await[&7].remaining_balance, dec!(53.00));
    }

    #[tokio::test]
    async fn test_rerate_unchanged_record_is_untouched() {
        let mut rec = record(1, "0512345678", 90, dec!(0.50), dec!(1.00));
        rec.country = "Domestic Mobile".to_string();
        let (job, _, quotas) = job(
            vec![rec],
            vec![pattern("05", CallCategory::Mobile, dec!(0.50))],
            dec!(50.00),
        );

        let summary = job.run(1).await.unwrap();
        assert_eq!(summary.records_changed, 0);
        assert_eq!(quotas.rows.lock().await[&7].remaining_balance, dec!(50.00));
    }

    #[tokio::test]
    async fn test_rerate_clears_flag_when_credit_applies() {
        // The record was flagged by an earlier rejected charge; the rate
        // drop settles its ledger delta, so the flag comes off.
        let mut rec = record(1, "0512345678", 90, dec!(2.00), dec!(4.00));
        rec.quota_exceeded = true;
        let (job, records, _) = job(
            vec![rec],
            vec![pattern("05", CallCategory::Mobile, dec!(0.50))],
            dec!(50.00),
        );

        let summary = job.run(1).await.unwrap();
        assert_eq!(summary.credits_applied, 1);

        let updated = records.find_by_id(1).await.unwrap().unwrap();
        assert!(!updated.quota_exceeded);
        assert_eq!(updated.total_cost, dec!(1.00));
    }

    #[tokio::test]
    async fn test_rerate_rejected_charge_flags_record() {
        let (job, records, quotas) = job(
            vec![record(1, "0512345678", 90, dec!(0.50), dec!(1.00))],
            vec![pattern("05", CallCategory::Mobile, dec!(2.00))],
            dec!(1.00),
        );

        let summary = job.run(1).await.unwrap();
        assert_eq!(summary.charges_rejected, 1);

        // The record carries the new cost and the exceeded flag; the
        // balance stays put.
        let updated = records.find_by_id(1).await.unwrap().unwrap();
        assert!(updated.quota_exceeded);
        assert_eq!(updated.total_cost, dec!(4.00));
        assert_eq!(quotas.rows.lock().await[&7].remaining_balance, dec!(1.00));
    }
}
