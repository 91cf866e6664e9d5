//! Repository implementations for the accounts domain.

pub mod api_keys;
pub mod challenges;
pub mod conflict;
pub mod configuration;
pub mod downloads;
pub mod pubkeys;
pub mod skylinks;
pub mod transactions;
pub mod uploads;
pub mod usage;
pub mod users;

use sqlx::{PgPool, Postgres, Transaction};

pub use api_keys::ApiKeyRepository;
pub use challenges::ChallengeRepository;
pub use configuration::ConfigurationRepository;
pub use downloads::DownloadRepository;
pub use pubkeys::PublicKeyRepository;
pub use skylinks::SkylinkRepository;
pub use transactions::{track_download, track_registry_read, track_registry_write, track_upload, unpin_upload};
pub use uploads::{Page, UploadRepository};
pub use usage::aggregate_for_user;
pub use users::UserRepository;

/// Combined repository access for the accounts domain.
#[derive(Clone)]
pub struct AccountsRepositories {
    pool: PgPool,
    pub users: UserRepository,
    pub skylinks: SkylinkRepository,
    pub uploads: UploadRepository,
    pub downloads: DownloadRepository,
    pub api_keys: ApiKeyRepository,
    pub pubkeys: PublicKeyRepository,
    pub challenges: ChallengeRepository,
    pub configuration: ConfigurationRepository,
}

impl AccountsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            skylinks: SkylinkRepository::new(pool.clone()),
            uploads: UploadRepository::new(pool.clone()),
            downloads: DownloadRepository::new(pool.clone()),
            api_keys: ApiKeyRepository::new(pool.clone()),
            pubkeys: PublicKeyRepository::new(pool.clone()),
            challenges: ChallengeRepository::new(pool.clone()),
            configuration: ConfigurationRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin a new database transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}
