use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::TokenKeys;
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub tokens: Arc<TokenKeys>,
    /// Hash checked when a login names an unknown user, so the bcrypt work
    /// is the same whether or not the account exists.
    pub login_decoy: Arc<str>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> anyhow::Result<Self> {
        let tokens = TokenKeys::from_secret(
            config.signing_secret()?.as_bytes(),
            config.auth.token_hours,
        );

        let login_decoy = bcrypt::hash("vignette-login-decoy", config.auth.bcrypt_cost)?;

        Ok(Self {
            db,
            config,
            tokens: Arc::new(tokens),
            login_decoy: login_decoy.into(),
        })
    }
}
