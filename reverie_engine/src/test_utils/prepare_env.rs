use std::path::Path;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::{NewUser, Role},
    traits::{InventoryManagement, UserManagement},
    SqliteDatabase,
};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

/// A fresh database file in the system temp directory.
pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("reverie_test_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database<P: AsRef<Path>>(path: P) {
    let p = path.as_ref().as_os_str().to_str().unwrap();
    if let Err(e) = Sqlite::drop_database(p).await {
        trace!("🚀️ Could not drop database {p}: {e:?}");
    }
    Sqlite::create_database(p).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {p}");
}

/// Creates a migrated database at a random path and opens it.
pub async fn fresh_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database")
}

/// Registers a user directly in the store, bypassing the admin check.
pub async fn seed_user(db: &SqliteDatabase, email: &str, role: Role) {
    let username = email.split('@').next().unwrap_or(email).to_string();
    db.insert_user(NewUser::new(email, username, role)).await.expect("Error seeding user");
}

/// Registers a vendor and sets their starting inventory.
pub async fn seed_vendor(db: &SqliteDatabase, email: &str, inventory: reverie_common::ResourceVector) {
    seed_user(db, email, Role::Vendor).await;
    db.initialize_inventory(email, inventory).await.expect("Error seeding inventory");
}
