use patron_domain::code;
use patron_rewards::domain::types::{JobContext, NotificationKind, Stage};
use patron_rewards::usecase::fulfillment::FulfillmentStrategy;
use patron_rewards::usecase::stages::code_activation::CodeActivationStage;

use crate::helpers::{
    MockRewardLedger, MockValueStore, referrer_entry, test_entry, test_job,
};

fn stage(
    ledger: &MockRewardLedger,
    store: &MockValueStore,
) -> CodeActivationStage<MockRewardLedger, MockValueStore> {
    CodeActivationStage {
        ledger: ledger.clone(),
        fulfillment: FulfillmentStrategy {
            value_store: store.clone(),
        },
    }
}

fn activation_job(customer_id: &str) -> patron_rewards::domain::types::Job {
    test_job(
        Stage::CodeActivation,
        JobContext {
            customer_id: Some(customer_id.to_owned()),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn should_assign_canonical_code_and_create_empty_store() {
    let ledger = MockRewardLedger::new(vec![test_entry("cus_bob", "Bob")]);
    let store = MockValueStore::working();
    let job = activation_job("cus_bob");

    stage(&ledger, &store).execute(&job).await.unwrap();

    let bob = ledger.entry("cus_bob").unwrap();
    assert!(bob.activated_as_referrer);
    assert_eq!(
        bob.personal_code.as_deref(),
        Some(code::candidate("Bob", "cus_bob", 0).as_str())
    );
    // A zero-balance store, ready to receive future rewards.
    assert_eq!(*store.created.lock().unwrap(), vec![0]);
    assert!(bob.value_store_handle.is_some());

    let queued = ledger.jobs.jobs_handle();
    let queued = queued.lock().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].stage, Stage::Notification);
    assert_eq!(queued[0].correlation_id, job.correlation_id);
    assert_eq!(
        queued[0].context.notification,
        Some(NotificationKind::CodeActivated)
    );
}

#[tokio::test]
async fn should_reuse_existing_value_store_handle() {
    let mut bob = test_entry("cus_bob", "Bob");
    bob.value_store_handle = Some("gc_bob".to_owned());
    let ledger = MockRewardLedger::new(vec![bob]);
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&activation_job("cus_bob"))
        .await
        .unwrap();

    let bob = ledger.entry("cus_bob").unwrap();
    assert!(bob.activated_as_referrer);
    assert_eq!(bob.value_store_handle.as_deref(), Some("gc_bob"));
    // No second store, no top-up either: activation moves no money.
    assert!(store.created.lock().unwrap().is_empty());
    assert!(store.top_ups.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_step_to_next_candidate_on_collision() {
    let canonical = code::candidate("Bob", "cus_bob", 0);
    let ledger = MockRewardLedger::new(vec![
        test_entry("cus_bob", "Bob"),
        referrer_entry("cus_other", "Bobby", &canonical),
    ]);
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&activation_job("cus_bob"))
        .await
        .unwrap();

    let bob = ledger.entry("cus_bob").unwrap();
    assert!(bob.activated_as_referrer);
    assert_eq!(
        bob.personal_code.as_deref(),
        Some(code::candidate("Bob", "cus_bob", 1).as_str())
    );
}

#[tokio::test]
async fn should_noop_when_already_activated() {
    let ledger = MockRewardLedger::new(vec![referrer_entry("cus_alice", "Alice", "ALICE0001")]);
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&activation_job("cus_alice"))
        .await
        .unwrap();

    assert_eq!(
        ledger.entry("cus_alice").unwrap().personal_code.as_deref(),
        Some("ALICE0001")
    );
    assert!(store.created.lock().unwrap().is_empty());
    assert!(ledger.jobs.jobs_handle().lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_ignore_order_linkage_for_zero_balance_creation() {
    let mut bob = test_entry("cus_bob", "Bob");
    bob.order_id = Some("ord_1".to_owned());
    bob.line_item_uid = Some("li_ord_1".to_owned());
    let ledger = MockRewardLedger::new(vec![bob]);
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&activation_job("cus_bob"))
        .await
        .unwrap();

    // The purchased-order path is for funded loads only.
    assert!(store.order_activations.lock().unwrap().is_empty());
    assert_eq!(*store.created.lock().unwrap(), vec![0]);
}

#[tokio::test]
async fn should_noop_without_ledger_entry() {
    let ledger = MockRewardLedger::empty();
    let store = MockValueStore::working();

    stage(&ledger, &store)
        .execute(&activation_job("cus_ghost"))
        .await
        .unwrap();

    assert!(store.created.lock().unwrap().is_empty());
    assert!(ledger.jobs.jobs_handle().lock().unwrap().is_empty());
}
