use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Caller, NewUser, Role, User},
    helpers::with_store_timeout,
    market_api::{guards::require_role, EngineConfig, MarketError},
    traits::UserManagement,
};

pub struct UserApi<B> {
    db: B,
    config: EngineConfig,
}

impl<B> Debug for UserApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserApi")
    }
}

impl<B> UserApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, config: EngineConfig::default() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B> UserApi<B>
where B: UserManagement
{
    /// Registers a client or vendor. Admin only.
    pub async fn register_user(&self, caller: &Caller, user: NewUser) -> Result<User, MarketError> {
        require_role(caller, Role::Admin, "register users")?;
        let email = user.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(MarketError::ValidationError(format!("{email} is not a valid email address")));
        }
        if user.username.trim().is_empty() {
            return Err(MarketError::ValidationError("A username is required".into()));
        }
        let user = NewUser { email: email.to_string(), ..user };
        let user = with_store_timeout(self.config.store_timeout, self.db.insert_user(user)).await?;
        info!("🔄️ {} registered {} as a {}", caller.email, user.email, user.role);
        Ok(user)
    }

    pub async fn fetch_user(&self, email: &str) -> Result<Option<User>, MarketError> {
        with_store_timeout(self.config.store_timeout, self.db.fetch_user(email)).await
    }
}
