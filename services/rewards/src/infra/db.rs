use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionError, TransactionTrait,
    sea_query::Expr,
};
use uuid::Uuid;

use patron_rewards_schema::{events, jobs, ledger_entries};

use crate::domain::repository::{ActivationResult, EventLedger, JobStore, RewardLedger};
use crate::domain::types::{
    DeliveryChannel, FirstContact, Fulfillment, Job, JobStatus, LedgerEntry, NewEvent, NewJob,
    Stage, TriggerType,
};
use crate::error::RewardsServiceError;

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ── Event ledger ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEventLedger {
    pub db: DatabaseConnection,
}

impl EventLedger for DbEventLedger {
    async fn record(
        &self,
        event: &NewEvent,
        job: Option<&NewJob>,
    ) -> Result<bool, RewardsServiceError> {
        let event = event.clone();
        let job = job.cloned();
        let result = self
            .db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    events::ActiveModel {
                        id: Set(event.id),
                        event_id: Set(event.event_id.clone()),
                        event_type: Set(event.event_type.clone()),
                        resource_id: Set(event.resource_id.clone()),
                        correlation_id: Set(event.correlation_id),
                        received_at: Set(event.received_at),
                    }
                    .insert(txn)
                    .await?;
                    if let Some(job) = &job {
                        insert_job(txn, Uuid::new_v4(), job).await?;
                    }
                    Ok(())
                })
            })
            .await;
        match result {
            Ok(()) => Ok(true),
            // Duplicate delivery, possibly racing: the unique event_id
            // constraint decided, not a pre-check.
            Err(TransactionError::Transaction(e)) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).context("record event").into()),
        }
    }

    async fn find_correlation(&self, event_id: &str) -> Result<Option<Uuid>, RewardsServiceError> {
        let model = events::Entity::find()
            .filter(events::Column::EventId.eq(event_id))
            .one(&self.db)
            .await
            .context("find event by event_id")?;
        Ok(model.map(|m| m.correlation_id))
    }
}

// ── Job store ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbJobStore {
    pub db: DatabaseConnection,
}

impl JobStore for DbJobStore {
    async fn enqueue(&self, job: &NewJob) -> Result<Uuid, RewardsServiceError> {
        let id = Uuid::new_v4();
        insert_job(&self.db, id, job).await.context("enqueue job")?;
        Ok(id)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        staleness: Duration,
        limit: u64,
    ) -> Result<Vec<Job>, RewardsServiceError> {
        let mut candidates = jobs::Entity::find()
            .filter(jobs::Column::Status.eq(JobStatus::Queued.as_str()))
            .filter(jobs::Column::ScheduledAt.lte(now))
            .order_by_asc(jobs::Column::ScheduledAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list due jobs")?;

        // Stuck jobs: claimed but never finished (e.g. crash mid-run).
        let cutoff = now - staleness;
        let stale = jobs::Entity::find()
            .filter(jobs::Column::Status.eq(JobStatus::Running.as_str()))
            .filter(jobs::Column::LockedAt.lt(cutoff))
            .order_by_asc(jobs::Column::LockedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list stale jobs")?;
        candidates.extend(stale);

        let mut claimed = Vec::new();
        for model in candidates {
            if claimed.len() as u64 >= limit {
                break;
            }
            // Compare-and-swap on (id, status, attempts): a concurrent
            // scheduler that already claimed this row changed both, so
            // exactly one claimant sees rows_affected = 1.
            let result = jobs::Entity::update_many()
                .col_expr(
                    jobs::Column::Status,
                    Expr::value(JobStatus::Running.as_str()),
                )
                .col_expr(jobs::Column::LockedAt, Expr::value(Some(now)))
                .col_expr(
                    jobs::Column::Attempts,
                    Expr::col(jobs::Column::Attempts).add(1),
                )
                .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
                .filter(jobs::Column::Id.eq(model.id))
                .filter(jobs::Column::Status.eq(model.status.clone()))
                .filter(jobs::Column::Attempts.eq(model.attempts))
                .exec(&self.db)
                .await
                .context("claim job")?;
            if result.rows_affected == 0 {
                continue;
            }
            let mut job = job_from_model(model)?;
            job.status = JobStatus::Running;
            job.locked_at = Some(now);
            job.attempts += 1;
            job.updated_at = now;
            claimed.push(job);
        }
        Ok(claimed)
    }

    async fn complete(&self, id: Uuid, attempts: i32) -> Result<(), RewardsServiceError> {
        let now = Utc::now();
        // Attempts doubles as the claim token: if another scheduler
        // reclaimed this job as stale, attempts moved on and the write
        // matches nothing.
        jobs::Entity::update_many()
            .col_expr(
                jobs::Column::Status,
                Expr::value(JobStatus::Completed.as_str()),
            )
            .col_expr(jobs::Column::LockedAt, Expr::value(None::<DateTime<Utc>>))
            .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
            .filter(jobs::Column::Id.eq(id))
            .filter(jobs::Column::Status.eq(JobStatus::Running.as_str()))
            .filter(jobs::Column::Attempts.eq(attempts))
            .exec(&self.db)
            .await
            .context("complete job")?;
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        attempts: i32,
        at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), RewardsServiceError> {
        let now = Utc::now();
        jobs::Entity::update_many()
            .col_expr(
                jobs::Column::Status,
                Expr::value(JobStatus::Queued.as_str()),
            )
            .col_expr(jobs::Column::ScheduledAt, Expr::value(at))
            .col_expr(jobs::Column::LockedAt, Expr::value(None::<DateTime<Utc>>))
            .col_expr(jobs::Column::LastError, Expr::value(Some(error.to_owned())))
            .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
            .filter(jobs::Column::Id.eq(id))
            .filter(jobs::Column::Status.eq(JobStatus::Running.as_str()))
            .filter(jobs::Column::Attempts.eq(attempts))
            .exec(&self.db)
            .await
            .context("reschedule job")?;
        Ok(())
    }

    async fn fail(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
    ) -> Result<(), RewardsServiceError> {
        let now = Utc::now();
        jobs::Entity::update_many()
            .col_expr(jobs::Column::Status, Expr::value(JobStatus::Error.as_str()))
            .col_expr(jobs::Column::LockedAt, Expr::value(None::<DateTime<Utc>>))
            .col_expr(jobs::Column::LastError, Expr::value(Some(error.to_owned())))
            .col_expr(jobs::Column::UpdatedAt, Expr::value(now))
            .filter(jobs::Column::Id.eq(id))
            .filter(jobs::Column::Status.eq(JobStatus::Running.as_str()))
            .filter(jobs::Column::Attempts.eq(attempts))
            .exec(&self.db)
            .await
            .context("fail job")?;
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: JobStatus,
        limit: u64,
    ) -> Result<Vec<Job>, RewardsServiceError> {
        let models = jobs::Entity::find()
            .filter(jobs::Column::Status.eq(status.as_str()))
            .order_by_asc(jobs::Column::ScheduledAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list jobs by status")?;
        models.into_iter().map(job_from_model).collect()
    }

    async fn list_by_correlation(
        &self,
        correlation_id: Uuid,
    ) -> Result<Vec<Job>, RewardsServiceError> {
        let models = jobs::Entity::find()
            .filter(jobs::Column::CorrelationId.eq(correlation_id))
            .order_by_asc(jobs::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list jobs by correlation id")?;
        models.into_iter().map(job_from_model).collect()
    }

    async fn find_latest(
        &self,
        correlation_id: Uuid,
        stage: Stage,
    ) -> Result<Option<Job>, RewardsServiceError> {
        let model = jobs::Entity::find()
            .filter(jobs::Column::CorrelationId.eq(correlation_id))
            .filter(jobs::Column::Stage.eq(stage.as_str()))
            .order_by_desc(jobs::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find latest job for stage")?;
        model.map(job_from_model).transpose()
    }
}

async fn insert_job<C: ConnectionTrait>(conn: &C, id: Uuid, job: &NewJob) -> Result<(), DbErr> {
    let now = Utc::now();
    let context = serde_json::to_value(&job.context).map_err(|e| DbErr::Json(e.to_string()))?;
    jobs::ActiveModel {
        id: Set(id),
        correlation_id: Set(job.correlation_id),
        trigger_type: Set(job.trigger_type.as_str().to_owned()),
        stage: Set(job.stage.as_str().to_owned()),
        status: Set(JobStatus::Queued.as_str().to_owned()),
        attempts: Set(0),
        scheduled_at: Set(job.scheduled_at),
        locked_at: Set(None),
        context: Set(context),
        last_error: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok(())
}

fn job_from_model(model: jobs::Model) -> Result<Job, RewardsServiceError> {
    let stage = Stage::parse(&model.stage)
        .ok_or_else(|| RewardsServiceError::UnknownStage(model.stage.clone()))?;
    let status = JobStatus::parse(&model.status)
        .ok_or_else(|| RewardsServiceError::UnknownStatus(model.status.clone()))?;
    let trigger_type = TriggerType::parse(&model.trigger_type)
        .ok_or_else(|| anyhow::anyhow!("unknown trigger type: {}", model.trigger_type))?;
    let context = serde_json::from_value(model.context).context("decode job context")?;
    Ok(Job {
        id: model.id,
        correlation_id: model.correlation_id,
        trigger_type,
        stage,
        status,
        attempts: model.attempts,
        scheduled_at: model.scheduled_at,
        locked_at: model.locked_at,
        context,
        last_error: model.last_error,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Reward ledger ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRewardLedger {
    pub db: DatabaseConnection,
}

impl RewardLedger for DbRewardLedger {
    async fn find(&self, customer_id: &str) -> Result<Option<LedgerEntry>, RewardsServiceError> {
        let model = ledger_entries::Entity::find_by_id(customer_id.to_owned())
            .one(&self.db)
            .await
            .context("find ledger entry")?;
        Ok(model.map(entry_from_model))
    }

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<LedgerEntry>, RewardsServiceError> {
        let model = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::PersonalCode.eq(code))
            .one(&self.db)
            .await
            .context("find ledger entry by code")?;
        Ok(model.map(entry_from_model))
    }

    async fn upsert_contact(&self, contact: &FirstContact) -> Result<(), RewardsServiceError> {
        let now = Utc::now();
        let existing = ledger_entries::Entity::find_by_id(contact.customer_id.clone())
            .one(&self.db)
            .await
            .context("find ledger entry for contact upsert")?;

        if let Some(existing) = existing {
            // Fill in blanks only; progress flags and totals are owned
            // by the stage executors.
            let mut active = ledger_entries::ActiveModel {
                customer_id: Set(existing.customer_id.clone()),
                ..Default::default()
            };
            let mut dirty = false;
            if existing.name.is_empty() {
                if let Some(name) = &contact.name {
                    active.name = Set(name.clone());
                    dirty = true;
                }
            }
            if existing.email.is_none() && contact.email.is_some() {
                active.email = Set(contact.email.clone());
                dirty = true;
            }
            if existing.order_id.is_none() && contact.order_id.is_some() {
                active.order_id = Set(contact.order_id.clone());
                active.line_item_uid = Set(contact.line_item_uid.clone());
                dirty = true;
            }
            if dirty {
                active.updated_at = Set(now);
                active
                    .update(&self.db)
                    .await
                    .context("update ledger entry contact fields")?;
            }
            return Ok(());
        }

        let insert = ledger_entries::ActiveModel {
            customer_id: Set(contact.customer_id.clone()),
            name: Set(contact.name.clone().unwrap_or_default()),
            email: Set(contact.email.clone()),
            personal_code: Set(None),
            value_store_handle: Set(None),
            got_signup_bonus: Set(false),
            activated_as_referrer: Set(false),
            first_payment_completed: Set(false),
            used_referral_code: Set(None),
            total_referrals: Set(0),
            total_rewards_cents: Set(0),
            delivery_channel: Set(None),
            activation_url: Set(None),
            pass_url: Set(None),
            order_id: Set(contact.order_id.clone()),
            line_item_uid: Set(contact.line_item_uid.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        match insert.insert(&self.db).await {
            Ok(_) => Ok(()),
            // Concurrent first contact for the same customer.
            Err(e) if is_unique_violation(&e) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context("insert ledger entry")
                .into()),
        }
    }

    async fn grant_signup_bonus(
        &self,
        customer_id: &str,
        used_code: &str,
        fulfillment: &Fulfillment,
        followup: &NewJob,
    ) -> Result<bool, RewardsServiceError> {
        let customer_id = customer_id.to_owned();
        let used_code = used_code.to_owned();
        let fulfillment = fulfillment.clone();
        let followup = followup.clone();
        let granted = self
            .db
            .transaction::<_, bool, DbErr>(|txn| {
                Box::pin(async move {
                    let result = ledger_entries::Entity::update_many()
                        .col_expr(ledger_entries::Column::GotSignupBonus, Expr::value(true))
                        .col_expr(
                            ledger_entries::Column::UsedReferralCode,
                            Expr::value(Some(used_code)),
                        )
                        .col_expr(
                            ledger_entries::Column::ValueStoreHandle,
                            Expr::value(Some(fulfillment.handle.clone())),
                        )
                        .col_expr(
                            ledger_entries::Column::DeliveryChannel,
                            Expr::value(Some(fulfillment.channel.as_str().to_owned())),
                        )
                        .col_expr(
                            ledger_entries::Column::ActivationUrl,
                            Expr::value(fulfillment.activation_url.clone()),
                        )
                        .col_expr(
                            ledger_entries::Column::PassUrl,
                            Expr::value(fulfillment.pass_url.clone()),
                        )
                        .col_expr(ledger_entries::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(ledger_entries::Column::CustomerId.eq(customer_id))
                        .filter(ledger_entries::Column::GotSignupBonus.eq(false))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Ok(false);
                    }
                    insert_job(txn, Uuid::new_v4(), &followup).await?;
                    Ok(true)
                })
            })
            .await
            .map_err(|e| anyhow::Error::new(e).context("grant signup bonus"))?;
        Ok(granted)
    }

    async fn settle_first_payment(
        &self,
        payer_id: &str,
        referrer_id: &str,
        amount_cents: i64,
        fulfillment: &Fulfillment,
        followups: &[NewJob],
    ) -> Result<bool, RewardsServiceError> {
        let payer_id = payer_id.to_owned();
        let referrer_id = referrer_id.to_owned();
        let fulfillment = fulfillment.clone();
        let followups = followups.to_vec();
        // Flag flip, referrer credit and the chained jobs commit
        // together: a failure anywhere rolls the flag back, so the
        // retry still finds the guard open.
        let settled = self
            .db
            .transaction::<_, bool, DbErr>(|txn| {
                Box::pin(async move {
                    let guard = ledger_entries::Entity::update_many()
                        .col_expr(
                            ledger_entries::Column::FirstPaymentCompleted,
                            Expr::value(true),
                        )
                        .col_expr(ledger_entries::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(ledger_entries::Column::CustomerId.eq(payer_id))
                        .filter(ledger_entries::Column::FirstPaymentCompleted.eq(false))
                        .exec(txn)
                        .await?;
                    if guard.rows_affected == 0 {
                        return Ok(false);
                    }
                    ledger_entries::Entity::update_many()
                        .col_expr(
                            ledger_entries::Column::TotalReferrals,
                            Expr::col(ledger_entries::Column::TotalReferrals).add(1),
                        )
                        .col_expr(
                            ledger_entries::Column::TotalRewardsCents,
                            Expr::col(ledger_entries::Column::TotalRewardsCents)
                                .add(amount_cents),
                        )
                        .col_expr(
                            ledger_entries::Column::ValueStoreHandle,
                            Expr::value(Some(fulfillment.handle.clone())),
                        )
                        .col_expr(
                            ledger_entries::Column::DeliveryChannel,
                            Expr::value(Some(fulfillment.channel.as_str().to_owned())),
                        )
                        .col_expr(
                            ledger_entries::Column::ActivationUrl,
                            Expr::value(fulfillment.activation_url.clone()),
                        )
                        .col_expr(
                            ledger_entries::Column::PassUrl,
                            Expr::value(fulfillment.pass_url.clone()),
                        )
                        .col_expr(ledger_entries::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(ledger_entries::Column::CustomerId.eq(referrer_id))
                        .exec(txn)
                        .await?;
                    for followup in &followups {
                        insert_job(txn, Uuid::new_v4(), followup).await?;
                    }
                    Ok(true)
                })
            })
            .await
            .map_err(|e| anyhow::Error::new(e).context("settle first payment"))?;
        Ok(settled)
    }

    async fn activate_referrer(
        &self,
        customer_id: &str,
        code: &str,
        fulfillment: Option<&Fulfillment>,
        followup: &NewJob,
    ) -> Result<ActivationResult, RewardsServiceError> {
        let customer_id = customer_id.to_owned();
        let code = code.to_owned();
        let fulfillment = fulfillment.cloned();
        let followup = followup.clone();
        let result = self
            .db
            .transaction::<_, ActivationResult, DbErr>(|txn| {
                Box::pin(async move {
                    let mut update = ledger_entries::Entity::update_many()
                        .col_expr(
                            ledger_entries::Column::ActivatedAsReferrer,
                            Expr::value(true),
                        )
                        .col_expr(
                            ledger_entries::Column::PersonalCode,
                            Expr::value(Some(code)),
                        )
                        .col_expr(ledger_entries::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(ledger_entries::Column::CustomerId.eq(customer_id))
                        .filter(ledger_entries::Column::ActivatedAsReferrer.eq(false));
                    if let Some(fulfillment) = &fulfillment {
                        update = update
                            .col_expr(
                                ledger_entries::Column::ValueStoreHandle,
                                Expr::value(Some(fulfillment.handle.clone())),
                            )
                            .col_expr(
                                ledger_entries::Column::DeliveryChannel,
                                Expr::value(Some(fulfillment.channel.as_str().to_owned())),
                            )
                            .col_expr(
                                ledger_entries::Column::ActivationUrl,
                                Expr::value(fulfillment.activation_url.clone()),
                            )
                            .col_expr(
                                ledger_entries::Column::PassUrl,
                                Expr::value(fulfillment.pass_url.clone()),
                            );
                    }
                    let result = update.exec(txn).await?;
                    if result.rows_affected == 0 {
                        return Ok(ActivationResult::AlreadyActivated);
                    }
                    insert_job(txn, Uuid::new_v4(), &followup).await?;
                    Ok(ActivationResult::Activated)
                })
            })
            .await;
        match result {
            Ok(decided) => Ok(decided),
            // personal_code unique constraint: the probe loop retries
            // with the next candidate.
            Err(TransactionError::Transaction(e)) if is_unique_violation(&e) => {
                Ok(ActivationResult::CodeTaken)
            }
            Err(e) => Err(anyhow::Error::new(e).context("activate referrer").into()),
        }
    }
}

fn entry_from_model(model: ledger_entries::Model) -> LedgerEntry {
    LedgerEntry {
        customer_id: model.customer_id,
        name: model.name,
        email: model.email,
        personal_code: model.personal_code,
        value_store_handle: model.value_store_handle,
        got_signup_bonus: model.got_signup_bonus,
        activated_as_referrer: model.activated_as_referrer,
        first_payment_completed: model.first_payment_completed,
        used_referral_code: model.used_referral_code,
        total_referrals: model.total_referrals,
        total_rewards_cents: model.total_rewards_cents,
        delivery_channel: model
            .delivery_channel
            .as_deref()
            .and_then(DeliveryChannel::parse),
        activation_url: model.activation_url,
        pass_url: model.pass_url,
        order_id: model.order_id,
        line_item_uid: model.line_item_uid,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
