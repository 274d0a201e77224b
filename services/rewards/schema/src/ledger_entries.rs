use sea_orm::entity::prelude::*;

/// Per-customer reward ledger: the source of idempotency truth for the
/// pipeline. Progress flags only ever move false → true, and only via
/// conditional updates.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// POS-assigned customer id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub customer_id: String,
    pub name: String,
    pub email: Option<String>,
    /// Globally unique once non-null; backs the collision-probe loop.
    #[sea_orm(unique)]
    pub personal_code: Option<String>,
    /// Opaque handle of the customer's gift card, if one exists.
    pub value_store_handle: Option<String>,
    pub got_signup_bonus: bool,
    pub activated_as_referrer: bool,
    pub first_payment_completed: bool,
    pub used_referral_code: Option<String>,
    pub total_referrals: i32,
    pub total_rewards_cents: i64,
    pub delivery_channel: Option<String>,
    pub activation_url: Option<String>,
    pub pass_url: Option<String>,
    /// Order linkage captured from booking/payment payloads; enables
    /// the order-based activation path.
    pub order_id: Option<String>,
    pub line_item_uid: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
