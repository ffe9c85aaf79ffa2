//! Group fees: one charge per member, tagged with a shared batch id.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    Actor, AuditAction, AuditEntry, EngineError, EntryStatus, GroupFeeReceipt, LedgerEntry,
    MovementType, ResultEngine, TransferCmd, WaivePlan, WaiveReceipt, audit, ledger_entries,
    movement::validate_amount, store,
};

use super::{Engine, with_tx};

impl Engine {
    /// Charge `amount_per_member` to every listed member under a new batch id.
    ///
    /// Each charge commits on its own: a member that cannot be charged is
    /// reported in [`GroupFeeReceipt::failures`] and does not stop the others.
    /// An invalid amount or an unknown pool fails the whole call up front.
    /// Repeated member ids are charged once.
    pub async fn issue_group_fee<I, S>(
        &self,
        pool_id: Uuid,
        amount_per_member: i64,
        description: &str,
        member_ids: I,
        actor: Actor,
    ) -> ResultEngine<GroupFeeReceipt>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_amount(amount_per_member)?;
        store::pool_balance(&self.database, pool_id).await?;

        let batch_id = Uuid::new_v4();
        let mut seen = HashSet::new();
        let mut receipt = GroupFeeReceipt {
            batch_id,
            success_count: 0,
            failures: Vec::new(),
        };

        for member_id in member_ids {
            let member_id = member_id.as_ref().trim().to_string();
            if !seen.insert(member_id.clone()) {
                continue;
            }
            let cmd = TransferCmd::new(
                pool_id,
                MovementType::GroupFee,
                amount_per_member,
                actor.clone(),
            )
            .member(member_id.clone())
            .description(description)
            .batch(batch_id);

            match self.create_transfer(cmd).await {
                Ok(_) => receipt.success_count += 1,
                Err(err) => {
                    warn!(
                        %pool_id,
                        %batch_id,
                        member_id = %member_id,
                        error = %err,
                        "group fee not charged"
                    );
                    receipt.failures.push((member_id, err));
                }
            }
        }

        info!(
            %pool_id,
            %batch_id,
            charged = receipt.success_count,
            failed = receipt.failures.len(),
            "group fee issued"
        );
        Ok(receipt)
    }

    /// Cancel a member's unpaid share of a group fee batch.
    ///
    /// The fee entry is marked settled with no settling entry, the amount goes
    /// back to the member and out of the pool. No funds check is applied to
    /// the pool.
    pub async fn waive_group_fee_debt(
        &self,
        pool_id: Uuid,
        member_id: &str,
        batch_id: Uuid,
        actor: Actor,
    ) -> ResultEngine<WaiveReceipt> {
        let plan = self
            .preview_waive(pool_id, member_id, batch_id, actor)
            .await?;
        self.commit_waive(plan).await
    }

    /// Find the unsettled fee share and capture the balances the waive will
    /// be applied to. Reads only.
    pub async fn preview_waive(
        &self,
        pool_id: Uuid,
        member_id: &str,
        batch_id: Uuid,
        actor: Actor,
    ) -> ResultEngine<WaivePlan> {
        let fee = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::PoolId.eq(pool_id.to_string()))
            .filter(ledger_entries::Column::MemberId.eq(member_id))
            .filter(ledger_entries::Column::BatchId.eq(batch_id.to_string()))
            .filter(ledger_entries::Column::MovementType.eq(MovementType::GroupFee.as_str()))
            .filter(ledger_entries::Column::Status.eq(EntryStatus::Approved.as_str()))
            .filter(ledger_entries::Column::SettledAt.is_null())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::DebtNotFound {
                member_id: member_id.to_string(),
                batch_id,
            })
            .and_then(LedgerEntry::try_from)?;

        Ok(WaivePlan {
            pool_id,
            member_id: member_id.to_string(),
            batch_id,
            entry_id: fee.id,
            amount_minor: fee.amount_minor,
            actor,
            pool_before: store::pool_balance(&self.database, pool_id).await?,
            member_before: store::member_balance(&self.database, pool_id, member_id).await?,
        })
    }

    /// Apply a previewed waive atomically.
    ///
    /// Fails with [`EngineError::DebtNotFound`] when the fee was settled in
    /// the meantime and with [`EngineError::ConcurrencyConflict`] when a
    /// balance moved. Either way the fee stays as it was.
    pub async fn commit_waive(&self, plan: WaivePlan) -> ResultEngine<WaiveReceipt> {
        let amount = plan.amount_minor;
        let receipt = with_tx!(self, |db_tx| {
            let result = ledger_entries::Entity::update_many()
                .col_expr(ledger_entries::Column::SettledAt, Expr::value(Utc::now()))
                .filter(ledger_entries::Column::Id.eq(plan.entry_id.to_string()))
                .filter(ledger_entries::Column::SettledAt.is_null())
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::DebtNotFound {
                    member_id: plan.member_id.clone(),
                    batch_id: plan.batch_id,
                });
            }

            let new_pool_balance =
                store::swap_pool_balance(&db_tx, plan.pool_id, plan.pool_before, -amount).await?;
            let new_member_balance = store::swap_member_balance(
                &db_tx,
                plan.pool_id,
                &plan.member_id,
                plan.member_before,
                amount,
            )
            .await?;

            let audit_entry = AuditEntry::new(
                plan.pool_id,
                &plan.actor,
                AuditAction::GroupFeeWaived,
                plan.entry_id,
                json!({
                    "member_id": plan.member_id,
                    "batch_id": plan.batch_id.to_string(),
                    "amount_minor": amount,
                    "balance_before": plan.pool_before,
                    "balance_after": new_pool_balance,
                    "member_balance_before": plan.member_before,
                    "member_balance_after": new_member_balance,
                }),
            );
            audit::ActiveModel::from(&audit_entry).insert(&db_tx).await?;

            Ok::<_, EngineError>(WaiveReceipt {
                entry_id: plan.entry_id,
                amount_waived: amount,
                new_pool_balance,
            })
        })?;

        info!(
            pool_id = %plan.pool_id,
            batch_id = %plan.batch_id,
            member_id = %plan.member_id,
            amount_minor = amount,
            actor = %plan.actor.id,
            "group fee waived"
        );
        Ok(receipt)
    }
}
