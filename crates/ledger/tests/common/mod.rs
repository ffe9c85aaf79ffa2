#![allow(dead_code)]

use ledger::{Actor, Engine, MovementType, TransferCmd};
use migration::MigratorTrait;
use sea_orm::Database;
use uuid::Uuid;

pub async fn engine() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

pub fn boss() -> Actor {
    Actor::new("100", "Boss")
}

/// A pool with the given members, funded with `balance` through an income.
pub async fn pool_with(engine: &Engine, balance: i64, members: &[&str]) -> Uuid {
    let pool_id = engine.new_pool("Crew", &boss()).await.unwrap();
    for member in members {
        engine
            .add_member(pool_id, member, &format!("Member {member}"))
            .await
            .unwrap();
    }
    if balance > 0 {
        engine
            .create_transfer(
                TransferCmd::new(pool_id, MovementType::Income, balance, boss())
                    .description("seed"),
            )
            .await
            .unwrap();
    }
    pool_id
}

pub fn cmd(pool_id: Uuid, kind: MovementType, amount: i64) -> TransferCmd {
    TransferCmd::new(pool_id, kind, amount, boss())
}

pub async fn pool_balance(engine: &Engine, pool_id: Uuid) -> i64 {
    engine.pool(pool_id).await.unwrap().balance
}

pub async fn member_balance(engine: &Engine, pool_id: Uuid, member_id: &str) -> i64 {
    engine.member(pool_id, member_id).await.unwrap().balance
}
