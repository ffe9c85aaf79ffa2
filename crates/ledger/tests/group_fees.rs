use ledger::{AuditAction, EngineError, EntryFilter, MovementType};
use uuid::Uuid;

mod common;

use common::{boss, cmd, engine, member_balance, pool_balance, pool_with};

#[tokio::test]
async fn issue_and_waive_one_share() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1", "m2"]).await;

    let receipt = engine
        .issue_group_fee(pool_id, 100, "dues", ["m1", "m2"], boss())
        .await
        .unwrap();
    assert_eq!(receipt.success_count, 2);
    assert!(receipt.is_complete());
    assert_eq!(pool_balance(&engine, pool_id).await, 200);
    assert_eq!(member_balance(&engine, pool_id, "m1").await, -100);
    assert_eq!(member_balance(&engine, pool_id, "m2").await, -100);

    let batch = engine
        .list_entries(pool_id, &EntryFilter::default().batch(receipt.batch_id))
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);
    assert!(
        batch
            .iter()
            .all(|e| e.movement_type == MovementType::GroupFee && e.description == "dues")
    );

    let waived = engine
        .waive_group_fee_debt(pool_id, "m1", receipt.batch_id, boss())
        .await
        .unwrap();
    assert_eq!(waived.amount_waived, 100);
    assert_eq!(waived.new_pool_balance, 100);
    assert_eq!(member_balance(&engine, pool_id, "m1").await, 0);
    assert_eq!(member_balance(&engine, pool_id, "m2").await, -100);

    let fee = engine.entry(waived.entry_id).await.unwrap();
    assert!(fee.is_settled());
    assert_eq!(fee.settled_by_entry_id, None);

    let trail = engine.audit_trail(waived.entry_id).await.unwrap();
    assert!(
        trail
            .iter()
            .any(|a| a.action == AuditAction::GroupFeeWaived && a.details["amount_minor"] == 100)
    );

    let err = engine
        .waive_group_fee_debt(pool_id, "m1", receipt.batch_id, boss())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::DebtNotFound {
            member_id: "m1".to_string(),
            batch_id: receipt.batch_id
        }
    );
    assert_eq!(pool_balance(&engine, pool_id).await, 100);
}

#[tokio::test]
async fn waive_without_matching_fee() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1"]).await;
    let batch_id = Uuid::new_v4();

    let err = engine
        .waive_group_fee_debt(pool_id, "m1", batch_id, boss())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DebtNotFound { .. }));
}

#[tokio::test]
async fn waive_rolls_back_when_a_balance_moved() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1"]).await;
    let receipt = engine
        .issue_group_fee(pool_id, 100, "dues", ["m1"], boss())
        .await
        .unwrap();

    let stale = engine
        .preview_waive(pool_id, "m1", receipt.batch_id, boss())
        .await
        .unwrap();
    assert_eq!(stale.amount_minor(), 100);
    assert_eq!(stale.member_before(), -100);

    engine
        .create_transfer(cmd(pool_id, MovementType::Deposit, 10).member("m1"))
        .await
        .unwrap();

    let err = engine.commit_waive(stale).await.unwrap_err();
    assert_eq!(err, EngineError::ConcurrencyConflict(format!("pool {pool_id}")));
    assert_eq!(pool_balance(&engine, pool_id).await, 110);
    assert_eq!(member_balance(&engine, pool_id, "m1").await, -90);
    let open = engine.unsettled_group_fees(pool_id, "m1").await.unwrap();
    assert_eq!(open.len(), 1);
    assert!(!open[0].is_settled());

    let waived = engine
        .waive_group_fee_debt(pool_id, "m1", receipt.batch_id, boss())
        .await
        .unwrap();
    assert_eq!(waived.entry_id, open[0].id);
    assert_eq!(waived.new_pool_balance, 10);
    assert_eq!(member_balance(&engine, pool_id, "m1").await, 10);
}

#[tokio::test]
async fn failures_do_not_stop_the_batch() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1", "m2"]).await;

    let receipt = engine
        .issue_group_fee(pool_id, 40, "weekly", ["m1", "ghost", "m1", "m2"], boss())
        .await
        .unwrap();
    assert_eq!(receipt.success_count, 2);
    assert_eq!(receipt.failures.len(), 1);
    assert_eq!(receipt.failures[0].0, "ghost");
    assert_eq!(
        receipt.failures[0].1,
        EngineError::MemberNotFound("ghost".to_string())
    );
    assert_eq!(member_balance(&engine, pool_id, "m1").await, -40);
    assert_eq!(pool_balance(&engine, pool_id).await, 80);
}

#[tokio::test]
async fn whole_batch_errors_are_returned_up_front() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1"]).await;

    let err = engine
        .issue_group_fee(pool_id, 0, "dues", ["m1"], boss())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let unknown = Uuid::new_v4();
    let err = engine
        .issue_group_fee(unknown, 10, "dues", ["m1"], boss())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::PoolNotFound(unknown));
    assert_eq!(member_balance(&engine, pool_id, "m1").await, 0);
}

#[tokio::test]
async fn deposit_back_above_zero_settles_fees() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1"]).await;

    let first = engine
        .issue_group_fee(pool_id, 30, "dues", ["m1"], boss())
        .await
        .unwrap();
    let second = engine
        .issue_group_fee(pool_id, 20, "guns", ["m1"], boss())
        .await
        .unwrap();
    assert_eq!(member_balance(&engine, pool_id, "m1").await, -50);
    assert_eq!(engine.unsettled_group_fees(pool_id, "m1").await.unwrap().len(), 2);

    let deposit = engine
        .create_transfer(cmd(pool_id, MovementType::Deposit, 60).member("m1"))
        .await
        .unwrap();
    assert_eq!(deposit.new_member_balance, Some(10));
    assert_eq!(deposit.settled_fees, 2);
    assert!(
        engine
            .unsettled_group_fees(pool_id, "m1")
            .await
            .unwrap()
            .is_empty()
    );

    for batch_id in [first.batch_id, second.batch_id] {
        let fees = engine
            .list_entries(pool_id, &EntryFilter::default().batch(batch_id))
            .await
            .unwrap();
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].settled_by_entry_id, Some(deposit.entry_id));
        assert!(fees[0].settled_at.is_some());
    }

    let trail = engine.audit_trail(deposit.entry_id).await.unwrap();
    assert_eq!(trail[0].details["settled_fees"], 2);

    let err = engine
        .waive_group_fee_debt(pool_id, "m1", first.batch_id, boss())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DebtNotFound { .. }));
}

#[tokio::test]
async fn partial_deposit_keeps_fees_open() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1"]).await;

    engine
        .issue_group_fee(pool_id, 50, "dues", ["m1"], boss())
        .await
        .unwrap();
    let deposit = engine
        .create_transfer(cmd(pool_id, MovementType::Deposit, 20).member("m1"))
        .await
        .unwrap();
    assert_eq!(deposit.new_member_balance, Some(-30));
    assert_eq!(deposit.settled_fees, 0);
    assert_eq!(engine.unsettled_group_fees(pool_id, "m1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn repayment_does_not_settle_fees() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1"]).await;

    engine
        .issue_group_fee(pool_id, 50, "dues", ["m1"], boss())
        .await
        .unwrap();
    let repayment = engine
        .create_transfer(cmd(pool_id, MovementType::Repayment, 50).member("m1"))
        .await
        .unwrap();
    assert_eq!(repayment.new_member_balance, Some(0));
    assert_eq!(repayment.settled_fees, 0);
    assert_eq!(engine.unsettled_group_fees(pool_id, "m1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn fee_covered_by_credit_settles_itself() {
    let engine = engine().await;
    let pool_id = pool_with(&engine, 0, &["m1"]).await;
    engine
        .create_transfer(cmd(pool_id, MovementType::Deposit, 150).member("m1"))
        .await
        .unwrap();

    let receipt = engine
        .issue_group_fee(pool_id, 100, "dues", ["m1"], boss())
        .await
        .unwrap();
    assert_eq!(member_balance(&engine, pool_id, "m1").await, 50);

    let fees = engine
        .list_entries(pool_id, &EntryFilter::default().batch(receipt.batch_id))
        .await
        .unwrap();
    assert_eq!(fees.len(), 1);
    assert_eq!(fees[0].settled_by_entry_id, Some(fees[0].id));
    assert!(
        engine
            .unsettled_group_fees(pool_id, "m1")
            .await
            .unwrap()
            .is_empty()
    );
}
