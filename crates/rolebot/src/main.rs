use std::sync::Arc;

use rolebot_core::config::Config;
use rolebot_store::SqliteRoleStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rolebot_core::logging::init("rolebot");

    let cfg = Config::load()?;
    let store = Arc::new(SqliteRoleStore::connect(&cfg.database_path).await?);

    rolebot_telegram::run_polling(cfg, store).await
}
