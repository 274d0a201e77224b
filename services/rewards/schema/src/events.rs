use sea_orm::entity::prelude::*;

/// Inbound platform event, deduplicated by the platform-assigned event id.
/// Append-only: rows are never mutated or deleted (audit trail).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Platform event id. The unique constraint is the at-least-once →
    /// at-most-once boundary, not a pre-check.
    #[sea_orm(unique)]
    pub event_id: String,
    pub event_type: String,
    pub resource_id: Option<String>,
    pub correlation_id: Uuid,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
