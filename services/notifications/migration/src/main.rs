use sea_orm_migration::prelude::*;

use orderflow_notifications_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
