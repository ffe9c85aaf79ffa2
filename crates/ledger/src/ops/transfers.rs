//! Balance transfer engine.
//!
//! Every movement goes through the same two steps:
//!
//! 1. **preview**: validate the request, read the pool (and member) balance
//!    and run the funds checks against them. Reads only.
//! 2. **commit**: inside one DB transaction, claim the pending entry (for
//!    approvals), swap the pool balance, swap the member balance, record the
//!    entry, settle group fees when the member came back to zero or above,
//!    then write the audit row.
//!
//! The balances read in step 1 are the compare-and-swap tokens of step 2. If
//! either moved in between, the commit fails with
//! [`EngineError::ConcurrencyConflict`] and nothing is written; the engine
//! never retries on its own.

use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    Actor, AuditAction, AuditEntry, EngineError, EntryStatus, LedgerEntry, MovementType,
    ResultEngine, TransferCmd, TransferPlan, TransferReceipt, audit,
    commands::PlanTarget,
    ledger_entries,
    movement::validate_amount,
    store,
    util::normalize_optional,
};

use super::{Engine, settlement::auto_settle, with_tx};

/// Request fields after the checks that need no database access.
struct ValidatedCmd {
    member_id: Option<String>,
    description: String,
    batch_id: Option<Uuid>,
}

/// Bounds the amount and resolves the member and batch for the movement type.
///
/// A member id given to a pool-only movement is dropped, as is a batch id on
/// anything but a group fee.
fn validate_cmd(cmd: &TransferCmd) -> ResultEngine<ValidatedCmd> {
    validate_amount(cmd.amount_minor)?;
    let member_id = if cmd.movement_type.requires_member() {
        let member_id = normalize_optional(cmd.member_id.as_deref())
            .ok_or(EngineError::MissingMember(cmd.movement_type))?;
        Some(member_id)
    } else {
        None
    };
    let batch_id = match cmd.movement_type {
        MovementType::GroupFee => cmd.batch_id,
        _ => None,
    };
    Ok(ValidatedCmd {
        member_id,
        description: normalize_optional(cmd.description.as_deref()).unwrap_or_default(),
        batch_id,
    })
}

impl Engine {
    /// Validate a movement and capture the balances it will be applied to.
    pub async fn preview_transfer(&self, cmd: TransferCmd) -> ResultEngine<TransferPlan> {
        let validated = validate_cmd(&cmd)?;
        self.plan_movement(
            cmd.pool_id,
            cmd.movement_type,
            cmd.amount_minor,
            validated.member_id,
            PlanTarget::NewEntry {
                description: validated.description,
                batch_id: validated.batch_id,
            },
            cmd.actor,
        )
        .await
    }

    /// Apply a previewed plan atomically.
    ///
    /// Fails with [`EngineError::ConcurrencyConflict`] when a balance moved
    /// since the preview, and with [`EngineError::AlreadyProcessed`] when the
    /// pending entry of an approval plan was decided in the meantime.
    pub async fn commit_transfer(&self, plan: TransferPlan) -> ResultEngine<TransferReceipt> {
        let receipt = with_tx!(self, |db_tx| apply_plan(&db_tx, &plan).await)?;
        info!(
            entry_id = %receipt.entry_id,
            pool_id = %plan.pool_id,
            movement = %plan.movement_type,
            amount_minor = plan.amount_minor,
            member_id = plan.member_id.as_deref().unwrap_or("-"),
            pool_balance = receipt.new_pool_balance,
            "movement committed"
        );
        Ok(receipt)
    }

    /// Validate and apply a movement in one call.
    pub async fn create_transfer(&self, cmd: TransferCmd) -> ResultEngine<TransferReceipt> {
        let plan = self.preview_transfer(cmd).await?;
        self.commit_transfer(plan).await
    }

    /// Record a movement as pending without touching any balance.
    ///
    /// Funds are not checked here: they are checked against the balances at
    /// approval time.
    pub async fn request_transfer(&self, cmd: TransferCmd) -> ResultEngine<Uuid> {
        let validated = validate_cmd(&cmd)?;
        store::pool_balance(&self.database, cmd.pool_id).await?;
        if let Some(member_id) = &validated.member_id {
            store::member_balance(&self.database, cmd.pool_id, member_id).await?;
        }

        let entry = LedgerEntry::new(
            cmd.pool_id,
            validated.member_id,
            cmd.movement_type,
            cmd.amount_minor,
            validated.description,
            validated.batch_id,
            cmd.actor.id.clone(),
        );
        let audit_entry = AuditEntry::new(
            entry.pool_id,
            &cmd.actor,
            AuditAction::TransferRequested,
            entry.id,
            json!({
                "movement_type": entry.movement_type.as_str(),
                "amount_minor": entry.amount_minor,
                "member_id": entry.member_id,
            }),
        );

        with_tx!(self, |db_tx| {
            ledger_entries::ActiveModel::from(&entry)
                .insert(&db_tx)
                .await?;
            audit::ActiveModel::from(&audit_entry).insert(&db_tx).await?;
            Ok::<_, EngineError>(())
        })?;
        info!(
            entry_id = %entry.id,
            pool_id = %entry.pool_id,
            movement = %entry.movement_type,
            "movement requested"
        );
        Ok(entry.id)
    }

    /// Plan the approval of a pending entry against the current balances.
    ///
    /// The funds checks run again here, since balances may have changed a
    /// lot since the request.
    pub async fn preview_approval(
        &self,
        entry_id: Uuid,
        actor: Actor,
    ) -> ResultEngine<TransferPlan> {
        let entry = self.entry(entry_id).await?;
        if entry.status != EntryStatus::Pending {
            return Err(EngineError::NotPending {
                entry_id,
                status: entry.status,
            });
        }
        validate_amount(entry.amount_minor)?;
        if entry.movement_type.requires_member() && entry.member_id.is_none() {
            return Err(EngineError::MissingMember(entry.movement_type));
        }
        self.plan_movement(
            entry.pool_id,
            entry.movement_type,
            entry.amount_minor,
            entry.member_id,
            PlanTarget::PendingEntry(entry_id),
            actor,
        )
        .await
    }

    /// Approve a pending entry and apply its movement.
    pub async fn approve_transfer(
        &self,
        entry_id: Uuid,
        actor: Actor,
    ) -> ResultEngine<TransferReceipt> {
        let plan = self.preview_approval(entry_id, actor).await?;
        self.commit_transfer(plan).await
    }

    /// Reject a pending entry. Balances are left alone.
    pub async fn reject_transfer(&self, entry_id: Uuid, actor: Actor) -> ResultEngine<()> {
        let entry = self.entry(entry_id).await?;
        if entry.status != EntryStatus::Pending {
            return Err(EngineError::NotPending {
                entry_id,
                status: entry.status,
            });
        }
        let audit_entry = AuditEntry::new(
            entry.pool_id,
            &actor,
            AuditAction::TransferRejected,
            entry_id,
            json!({
                "movement_type": entry.movement_type.as_str(),
                "amount_minor": entry.amount_minor,
                "member_id": entry.member_id,
            }),
        );

        with_tx!(self, |db_tx| {
            let result = ledger_entries::Entity::update_many()
                .col_expr(
                    ledger_entries::Column::Status,
                    Expr::value(EntryStatus::Rejected.as_str()),
                )
                .col_expr(ledger_entries::Column::RejectedAt, Expr::value(Utc::now()))
                .col_expr(ledger_entries::Column::RejectedBy, Expr::value(actor.id.clone()))
                .filter(ledger_entries::Column::Id.eq(entry_id.to_string()))
                .filter(ledger_entries::Column::Status.eq(EntryStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::AlreadyProcessed(entry_id));
            }
            audit::ActiveModel::from(&audit_entry).insert(&db_tx).await?;
            Ok::<_, EngineError>(())
        })?;
        info!(%entry_id, actor = %actor.id, "movement rejected");
        Ok(())
    }

    /// Read the balances a movement depends on and run its funds checks.
    async fn plan_movement(
        &self,
        pool_id: Uuid,
        movement_type: MovementType,
        amount_minor: i64,
        member_id: Option<String>,
        target: PlanTarget,
        actor: Actor,
    ) -> ResultEngine<TransferPlan> {
        let pool_before = store::pool_balance(&self.database, pool_id).await?;
        let member_before = match member_id.as_deref() {
            Some(member_id) => {
                Some(store::member_balance(&self.database, pool_id, member_id).await?)
            }
            None => None,
        };
        movement_type.check_funds(amount_minor, pool_before, member_before)?;

        Ok(TransferPlan {
            pool_id,
            movement_type,
            amount_minor,
            member_id,
            target,
            actor,
            pool_before,
            member_before,
        })
    }
}

/// Move a pending entry to approved, with the pool snapshots the commit is
/// about to produce. Zero rows means another decision got there first.
async fn claim_pending(
    db_tx: &DatabaseTransaction,
    plan: &TransferPlan,
    entry_id: Uuid,
) -> ResultEngine<()> {
    let delta = plan.movement_type.delta(plan.amount_minor);
    let balance_after = store::apply_delta(plan.pool_before, delta.pool)?;
    let result = ledger_entries::Entity::update_many()
        .col_expr(
            ledger_entries::Column::Status,
            Expr::value(EntryStatus::Approved.as_str()),
        )
        .col_expr(
            ledger_entries::Column::BalanceBefore,
            Expr::value(plan.pool_before),
        )
        .col_expr(ledger_entries::Column::BalanceAfter, Expr::value(balance_after))
        .col_expr(ledger_entries::Column::ApprovedAt, Expr::value(Utc::now()))
        .col_expr(
            ledger_entries::Column::ApprovedBy,
            Expr::value(plan.actor.id.clone()),
        )
        .filter(ledger_entries::Column::Id.eq(entry_id.to_string()))
        .filter(ledger_entries::Column::Status.eq(EntryStatus::Pending.as_str()))
        .exec(db_tx)
        .await?;
    if result.rows_affected == 0 {
        return Err(EngineError::AlreadyProcessed(entry_id));
    }
    Ok(())
}

/// Steps run inside the DB transaction of a commit.
///
/// An approval claims its pending entry before touching any balance, so two
/// approvals of one entry always end in [`EngineError::AlreadyProcessed`]
/// for the loser rather than a balance conflict.
async fn apply_plan(db_tx: &DatabaseTransaction, plan: &TransferPlan) -> ResultEngine<TransferReceipt> {
    if let PlanTarget::PendingEntry(entry_id) = plan.target {
        claim_pending(db_tx, plan, entry_id).await?;
    }

    let delta = plan.movement_type.delta(plan.amount_minor);
    let new_pool_balance =
        store::swap_pool_balance(db_tx, plan.pool_id, plan.pool_before, delta.pool).await?;
    let new_member_balance = match (plan.member_id.as_deref(), plan.member_before) {
        (Some(member_id), Some(member_before)) => Some(
            store::swap_member_balance(db_tx, plan.pool_id, member_id, member_before, delta.member)
                .await?,
        ),
        _ => None,
    };

    let (entry_id, action) = match &plan.target {
        PlanTarget::NewEntry {
            description,
            batch_id,
        } => {
            let mut entry = LedgerEntry::new(
                plan.pool_id,
                plan.member_id.clone(),
                plan.movement_type,
                plan.amount_minor,
                description.clone(),
                *batch_id,
                plan.actor.id.clone(),
            );
            entry.status = EntryStatus::Approved;
            entry.balance_before = Some(plan.pool_before);
            entry.balance_after = Some(new_pool_balance);
            ledger_entries::ActiveModel::from(&entry)
                .insert(db_tx)
                .await?;
            (entry.id, AuditAction::TransferCreated)
        }
        PlanTarget::PendingEntry(entry_id) => (*entry_id, AuditAction::TransferApproved),
    };

    let settled_fees = match plan.member_id.as_deref() {
        Some(member_id) if plan.triggers_settlement() => {
            let settled = auto_settle(db_tx, plan.pool_id, member_id, entry_id).await?;
            debug!(%entry_id, member_id, settled, "group fees settled");
            settled
        }
        _ => 0,
    };

    let audit_entry = AuditEntry::new(
        plan.pool_id,
        &plan.actor,
        action,
        entry_id,
        json!({
            "movement_type": plan.movement_type.as_str(),
            "amount_minor": plan.amount_minor,
            "member_id": plan.member_id,
            "balance_before": plan.pool_before,
            "balance_after": new_pool_balance,
            "member_balance_before": plan.member_before,
            "member_balance_after": new_member_balance,
            "settled_fees": settled_fees,
        }),
    );
    audit::ActiveModel::from(&audit_entry).insert(db_tx).await?;

    Ok(TransferReceipt {
        entry_id,
        new_pool_balance,
        new_member_balance,
        settled_fees,
    })
}
