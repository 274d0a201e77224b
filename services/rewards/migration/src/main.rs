use sea_orm_migration::prelude::*;

use patron_rewards_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
