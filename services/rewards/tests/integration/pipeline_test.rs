//! Whole-pipeline scenario: a referred signup through to the friend's
//! own activation as a referrer, driven exactly the way the service
//! drives it — webhook ingestion plus scheduler ticks.

use chrono::Utc;

use patron_domain::code;
use patron_rewards::domain::types::{DeliveryChannel, JobStatus, LedgerEntry};
use patron_rewards::usecase::fulfillment::FulfillmentStrategy;
use patron_rewards::usecase::ingest::{IngestEventInput, IngestEventUseCase};
use patron_rewards::usecase::scheduler::RunTickUseCase;
use patron_rewards::usecase::stages::PipelineDispatcher;
use patron_rewards::usecase::stages::code_activation::CodeActivationStage;
use patron_rewards::usecase::stages::notification::NotificationStage;
use patron_rewards::usecase::stages::referrer_reward::FirstPaymentRewardStage;
use patron_rewards::usecase::stages::signup_bonus::SignupBonusStage;
use patron_testing::webhook::{customer_created, payment_updated};

use crate::helpers::{
    MockEventLedger, MockJobStore, MockNotifier, MockRewardLedger, MockValueStore, referrer_entry,
    test_settings,
};

struct Harness {
    jobs: MockJobStore,
    ledger: MockRewardLedger,
    store: MockValueStore,
    notifier: MockNotifier,
    ingest: IngestEventUseCase<MockEventLedger, MockRewardLedger>,
    tick: RunTickUseCase<
        MockJobStore,
        PipelineDispatcher<MockRewardLedger, MockValueStore, MockNotifier>,
    >,
}

fn harness(entries: Vec<LedgerEntry>) -> Harness {
    let jobs = MockJobStore::empty();
    // The ledger shares the queue so jobs chained inside its writes are
    // claimable on the next tick.
    let ledger = MockRewardLedger::with_jobs(entries, jobs.clone());
    let store = MockValueStore::working();
    let notifier = MockNotifier::accepting();
    let fulfillment = || FulfillmentStrategy {
        value_store: store.clone(),
    };
    Harness {
        ingest: IngestEventUseCase {
            events: MockEventLedger::new(jobs.clone()),
            ledger: ledger.clone(),
        },
        tick: RunTickUseCase {
            jobs: jobs.clone(),
            dispatch: PipelineDispatcher {
                signup_bonus: SignupBonusStage {
                    ledger: ledger.clone(),
                    fulfillment: fulfillment(),
                    bonus_amount_cents: 1000,
                },
                first_payment_reward: FirstPaymentRewardStage {
                    ledger: ledger.clone(),
                    fulfillment: fulfillment(),
                    reward_amount_cents: 1000,
                },
                code_activation: CodeActivationStage {
                    ledger: ledger.clone(),
                    fulfillment: fulfillment(),
                },
                notification: NotificationStage {
                    ledger: ledger.clone(),
                    notifier: notifier.clone(),
                    bonus_amount_cents: 1000,
                    reward_amount_cents: 1000,
                },
            },
            settings: test_settings(),
        },
        jobs,
        ledger,
        store,
        notifier,
    }
}

impl Harness {
    /// Tick until the queue drains, like the timer loop would.
    async fn drain(&self) {
        loop {
            let outcome = self.tick.execute(Utc::now()).await.unwrap();
            assert_eq!(outcome.failed, 0, "no job should go terminal");
            assert_eq!(outcome.rescheduled, 0, "no job should need a retry");
            if outcome.claimed == 0 {
                return;
            }
        }
    }
}

#[tokio::test]
async fn should_run_referred_friend_from_signup_to_own_activation() {
    let h = harness(vec![referrer_entry("cus_alice", "Alice", "ALICE0001")]);

    // Bob signs up citing Alice's code.
    let outcome = h
        .ingest
        .execute(IngestEventInput {
            event: customer_created("cus_bob", "Bob", "bob@example.com", Some("ALICE0001")),
        })
        .await
        .unwrap();
    assert!(outcome.accepted);
    h.drain().await;

    let bob = h.ledger.entry("cus_bob").unwrap();
    assert!(bob.got_signup_bonus);
    assert_eq!(bob.delivery_channel, Some(DeliveryChannel::OwnerFunded));
    assert_eq!(*h.store.created.lock().unwrap(), vec![1000]);

    // Bob completes his first payment.
    h.ingest
        .execute(IngestEventInput {
            event: payment_updated("cus_bob", "pay_1", "COMPLETED"),
        })
        .await
        .unwrap();
    h.drain().await;

    // Alice got her reward as a top-up on her existing store.
    let alice = h.ledger.entry("cus_alice").unwrap();
    assert_eq!(alice.total_referrals, 1);
    assert_eq!(alice.total_rewards_cents, 1000);
    assert_eq!(
        *h.store.top_ups.lock().unwrap(),
        vec![("gc_cus_alice".to_owned(), 1000)]
    );

    // Bob is now a referrer himself, with his canonical code and the
    // store he already got with his bonus.
    let bob = h.ledger.entry("cus_bob").unwrap();
    assert!(bob.first_payment_completed);
    assert!(bob.activated_as_referrer);
    assert_eq!(
        bob.personal_code.as_deref(),
        Some(code::candidate("Bob", "cus_bob", 0).as_str())
    );
    assert_eq!(*h.store.created.lock().unwrap(), vec![1000]);

    // Three customer-facing messages, in pipeline order.
    let sent = h.notifier.sent.lock().unwrap();
    let templates: Vec<&str> = sent.iter().map(|(t, _, _)| t.as_str()).collect();
    assert_eq!(
        templates,
        vec![
            "referral-bonus-issued",
            "referral-reward-credited",
            "referral-code-activated",
        ]
    );
    assert_eq!(sent[1].1, "alice@example.com");

    // Everything on the queue ended completed.
    let stored = h.jobs.jobs_handle();
    let stored = stored.lock().unwrap();
    assert!(stored.iter().all(|j| j.status == JobStatus::Completed));
}

#[tokio::test]
async fn should_absorb_redelivered_payment_event() {
    let h = harness(vec![referrer_entry("cus_alice", "Alice", "ALICE0001")]);

    h.ingest
        .execute(IngestEventInput {
            event: customer_created("cus_bob", "Bob", "bob@example.com", Some("ALICE0001")),
        })
        .await
        .unwrap();
    h.drain().await;

    let payment = payment_updated("cus_bob", "pay_1", "COMPLETED");
    h.ingest
        .execute(IngestEventInput {
            event: payment.clone(),
        })
        .await
        .unwrap();
    h.drain().await;

    // The provider redelivers the same payment event.
    let dup = h
        .ingest
        .execute(IngestEventInput { event: payment })
        .await
        .unwrap();
    assert!(!dup.accepted);
    h.drain().await;

    // And a fresh payment event for the same customer slips past dedup
    // but hits the first-payment flag.
    h.ingest
        .execute(IngestEventInput {
            event: payment_updated("cus_bob", "pay_1_retry", "COMPLETED"),
        })
        .await
        .unwrap();
    h.drain().await;

    let alice = h.ledger.entry("cus_alice").unwrap();
    assert_eq!(alice.total_referrals, 1);
    assert_eq!(alice.total_rewards_cents, 1000);
    assert_eq!(h.store.top_ups.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_leave_unreferred_signup_without_bonus() {
    let h = harness(vec![]);

    h.ingest
        .execute(IngestEventInput {
            event: customer_created("cus_carol", "Carol", "carol@example.com", None),
        })
        .await
        .unwrap();
    h.drain().await;

    let carol = h.ledger.entry("cus_carol").unwrap();
    assert!(!carol.got_signup_bonus);
    assert!(h.store.created.lock().unwrap().is_empty());
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}
