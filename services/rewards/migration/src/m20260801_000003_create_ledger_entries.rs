use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::CustomerId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Name).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::Email).string())
                    .col(
                        ColumnDef::new(LedgerEntries::PersonalCode)
                            .string()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::ValueStoreHandle).string())
                    .col(
                        ColumnDef::new(LedgerEntries::GotSignupBonus)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::ActivatedAsReferrer)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::FirstPaymentCompleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(LedgerEntries::UsedReferralCode).string())
                    .col(
                        ColumnDef::new(LedgerEntries::TotalReferrals)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::TotalRewardsCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(LedgerEntries::DeliveryChannel).string())
                    .col(ColumnDef::new(LedgerEntries::ActivationUrl).string())
                    .col(ColumnDef::new(LedgerEntries::PassUrl).string())
                    .col(ColumnDef::new(LedgerEntries::OrderId).string())
                    .col(ColumnDef::new(LedgerEntries::LineItemUid).string())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    CustomerId,
    Name,
    Email,
    PersonalCode,
    ValueStoreHandle,
    GotSignupBonus,
    ActivatedAsReferrer,
    FirstPaymentCompleted,
    UsedReferralCode,
    TotalReferrals,
    TotalRewardsCents,
    DeliveryChannel,
    ActivationUrl,
    PassUrl,
    OrderId,
    LineItemUid,
    CreatedAt,
    UpdatedAt,
}
