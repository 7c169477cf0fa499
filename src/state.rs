use crate::config::AppConfig;
use crate::mail::{LogMailer, Mailer};
use crate::storage::{FsStorage, StorageClient};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = crate::db::connect(&config.database_url).await?;

        let storage = Arc::new(FsStorage::new(&config.avatar_dir).await?) as Arc<dyn StorageClient>;
        let mailer = Arc::new(LogMailer) as Arc<dyn Mailer>;

        Ok(Self {
            db,
            config,
            storage,
            mailer,
        })
    }
}
