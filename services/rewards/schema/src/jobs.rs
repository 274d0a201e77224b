use sea_orm::entity::prelude::*;

/// Pipeline work item. Terminal rows (completed/error) are retained for
/// observability; the claim update is the row-level lock.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub trigger_type: String,
    pub stage: String,
    pub status: String,
    pub attempts: i32,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    /// Set only while status = running; stale values are reclaimed.
    pub locked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub context: Json,
    pub last_error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
