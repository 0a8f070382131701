use std::sync::Arc;

use chrono::Duration;
use moodmeter_core::storage::{data_dir, open_store};
use moodmeter_core::{Access, Authorizer, Config, Repository};

/// Everything a command needs: configuration, the repository and the
/// access level of the presented credential.
pub struct Context {
    pub config: Config,
    pub repo: Arc<Repository>,
    pub access: Access,
}

impl Context {
    pub fn open(token: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let dir = data_dir()?;
        let store = open_store(config.storage.backend, &dir)?;
        let repo = Repository::new(store)
            .with_retention(Duration::days(config.flow.retention_days));
        let authorizer = Authorizer::from_env_or_digest(config.auth.secret_sha256.as_deref())?;
        let access = authorizer.check(token);
        tracing::debug!(dir = %dir.display(), backend = ?config.storage.backend, ?access, "context opened");
        Ok(Self {
            config,
            repo: Arc::new(repo),
            access,
        })
    }

    /// Runtime for the long-running watch commands.
    pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
    }
}
