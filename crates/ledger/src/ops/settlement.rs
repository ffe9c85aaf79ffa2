use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EntryStatus, MovementType, ResultEngine, ledger_entries};

/// Mark every approved, unsettled group fee of a member as settled by
/// `triggering_entry_id`. Returns how many entries were settled.
///
/// Callers run this inside the transaction of the triggering movement, once
/// the member balance is known to be zero or above.
pub(super) async fn auto_settle<C>(
    db: &C,
    pool_id: Uuid,
    member_id: &str,
    triggering_entry_id: Uuid,
) -> ResultEngine<u64>
where
    C: ConnectionTrait,
{
    let result = ledger_entries::Entity::update_many()
        .col_expr(ledger_entries::Column::SettledAt, Expr::value(Utc::now()))
        .col_expr(
            ledger_entries::Column::SettledByEntryId,
            Expr::value(triggering_entry_id.to_string()),
        )
        .filter(ledger_entries::Column::PoolId.eq(pool_id.to_string()))
        .filter(ledger_entries::Column::MemberId.eq(member_id))
        .filter(ledger_entries::Column::MovementType.eq(MovementType::GroupFee.as_str()))
        .filter(ledger_entries::Column::Status.eq(EntryStatus::Approved.as_str()))
        .filter(ledger_entries::Column::SettledAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
