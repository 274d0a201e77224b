use patron_rewards::domain::types::{JobContext, NotificationKind, Stage, TriggerType};
use patron_rewards::usecase::fulfillment::FulfillmentStrategy;
use patron_rewards::usecase::stages::signup_bonus::SignupBonusStage;

use crate::helpers::{
    MockRewardLedger, MockValueStore, referrer_entry, test_entry, test_job,
};

fn stage(
    ledger: &MockRewardLedger,
    store: &MockValueStore,
) -> SignupBonusStage<MockRewardLedger, MockValueStore> {
    SignupBonusStage {
        ledger: ledger.clone(),
        fulfillment: FulfillmentStrategy {
            value_store: store.clone(),
        },
        bonus_amount_cents: 1000,
    }
}

fn bonus_job(customer_id: &str, code: &str) -> patron_rewards::domain::types::Job {
    test_job(
        Stage::SignupBonus,
        JobContext {
            customer_id: Some(customer_id.to_owned()),
            referral_code: Some(code.to_owned()),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn should_grant_bonus_and_chain_notification() {
    let ledger = MockRewardLedger::new(vec![
        test_entry("cus_bob", "Bob"),
        referrer_entry("cus_alice", "Alice", "ALICE0001"),
    ]);
    let store = MockValueStore::working();
    let job = bonus_job("cus_bob", "ALICE0001");

    stage(&ledger, &store).execute(&job).await.unwrap();

    let bob = ledger.entry("cus_bob").unwrap();
    assert!(bob.got_signup_bonus);
    assert_eq!(bob.used_referral_code.as_deref(), Some("ALICE0001"));
    assert!(bob.value_store_handle.is_some());
    assert_eq!(*store.created.lock().unwrap(), vec![1000]);

    let queued = ledger.jobs.jobs_handle();
    let queued = queued.lock().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].stage, Stage::Notification);
    assert_eq!(queued[0].trigger_type, TriggerType::Pipeline);
    assert_eq!(queued[0].correlation_id, job.correlation_id);
    assert_eq!(
        queued[0].context.notification,
        Some(NotificationKind::BonusIssued)
    );
}

#[tokio::test]
async fn should_noop_when_bonus_already_granted() {
    let mut bob = test_entry("cus_bob", "Bob");
    bob.got_signup_bonus = true;
    let ledger = MockRewardLedger::new(vec![
        bob,
        referrer_entry("cus_alice", "Alice", "ALICE0001"),
    ]);
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&bonus_job("cus_bob", "ALICE0001"))
        .await
        .unwrap();

    // No second payout, no notification.
    assert!(store.created.lock().unwrap().is_empty());
    assert!(store.top_ups.lock().unwrap().is_empty());
    assert!(ledger.jobs.jobs_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_noop_when_code_does_not_resolve() {
    let ledger = MockRewardLedger::new(vec![test_entry("cus_bob", "Bob")]);
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&bonus_job("cus_bob", "NOSUCH001"))
        .await
        .unwrap();

    assert!(!ledger.entry("cus_bob").unwrap().got_signup_bonus);
    assert!(store.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_refuse_self_referral() {
    let mut alice = referrer_entry("cus_alice", "Alice", "ALICE0001");
    alice.got_signup_bonus = false;
    alice.value_store_handle = None;
    let ledger = MockRewardLedger::new(vec![alice]);
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&bonus_job("cus_alice", "ALICE0001"))
        .await
        .unwrap();

    assert!(!ledger.entry("cus_alice").unwrap().got_signup_bonus);
    assert!(store.created.lock().unwrap().is_empty());
    assert!(ledger.jobs.jobs_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_noop_without_ledger_entry() {
    let ledger = MockRewardLedger::empty();
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&bonus_job("cus_ghost", "ALICE0001"))
        .await
        .unwrap();

    assert!(store.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_noop_when_job_cites_no_code() {
    let ledger = MockRewardLedger::new(vec![test_entry("cus_bob", "Bob")]);
    let store = MockValueStore::working();
    let job = test_job(
        Stage::SignupBonus,
        JobContext {
            customer_id: Some("cus_bob".to_owned()),
            ..Default::default()
        },
    );

    stage(&ledger, &store).execute(&job).await.unwrap();

    assert!(!ledger.entry("cus_bob").unwrap().got_signup_bonus);
    assert!(store.created.lock().unwrap().is_empty());
}
