//! Balance store.
//!
//! The only code that reads or writes `pools.balance` and `members.balance`.
//! Writes are compare-and-swap: the balance observed by the caller is the
//! concurrency token, so an update touching zero rows means someone else
//! moved the balance first.

use sea_orm::{ConnectionTrait, QueryFilter, prelude::*, sea_query::Expr};
use tracing::warn;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, members, pools};

pub(crate) async fn pool_balance<C>(db: &C, pool_id: Uuid) -> ResultEngine<i64>
where
    C: ConnectionTrait,
{
    pools::Entity::find_by_id(pool_id.to_string())
        .one(db)
        .await?
        .map(|pool| pool.balance)
        .ok_or(EngineError::PoolNotFound(pool_id))
}

pub(crate) async fn member_balance<C>(db: &C, pool_id: Uuid, member_id: &str) -> ResultEngine<i64>
where
    C: ConnectionTrait,
{
    members::Entity::find_by_id((pool_id.to_string(), member_id.to_string()))
        .one(db)
        .await?
        .map(|member| member.balance)
        .ok_or_else(|| EngineError::MemberNotFound(member_id.to_string()))
}

pub(crate) fn apply_delta(balance: i64, delta: i64) -> ResultEngine<i64> {
    balance
        .checked_add(delta)
        .ok_or(EngineError::BalanceOverflow { balance, delta })
}

/// Set the pool balance to `expected + delta` if it still equals `expected`.
///
/// Returns the new balance.
pub(crate) async fn swap_pool_balance<C>(
    db: &C,
    pool_id: Uuid,
    expected: i64,
    delta: i64,
) -> ResultEngine<i64>
where
    C: ConnectionTrait,
{
    let new_balance = apply_delta(expected, delta)?;
    let result = pools::Entity::update_many()
        .col_expr(pools::Column::Balance, Expr::value(new_balance))
        .filter(pools::Column::Id.eq(pool_id.to_string()))
        .filter(pools::Column::Balance.eq(expected))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        warn!(%pool_id, expected, "pool balance changed since it was read");
        return Err(EngineError::ConcurrencyConflict(format!("pool {pool_id}")));
    }
    Ok(new_balance)
}

/// Same as [`swap_pool_balance`] for one member of the pool.
pub(crate) async fn swap_member_balance<C>(
    db: &C,
    pool_id: Uuid,
    member_id: &str,
    expected: i64,
    delta: i64,
) -> ResultEngine<i64>
where
    C: ConnectionTrait,
{
    let new_balance = apply_delta(expected, delta)?;
    let result = members::Entity::update_many()
        .col_expr(members::Column::Balance, Expr::value(new_balance))
        .filter(members::Column::PoolId.eq(pool_id.to_string()))
        .filter(members::Column::MemberId.eq(member_id))
        .filter(members::Column::Balance.eq(expected))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        warn!(%pool_id, member_id, expected, "member balance changed since it was read");
        return Err(EngineError::ConcurrencyConflict(format!(
            "member \"{member_id}\""
        )));
    }
    Ok(new_balance)
}
