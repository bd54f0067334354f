use std::collections::HashMap;

use cucumber::World;
use log::*;
use reverie_engine::{
    db_types::{Caller, PostId, Role},
    events::EventProducers,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    InventoryApi,
    MarketError,
    MarketplaceDatabase,
    OfferFlowApi,
    PostApi,
    PseudonymScheme,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

#[derive(Default, Debug, World)]
pub struct MarketWorld {
    pub system: Option<MarketSystem>,
    /// Callers by their short name, as used in the feature files.
    pub callers: HashMap<String, Caller>,
    /// Post ids by the description they were created with.
    pub posts: HashMap<String, PostId>,
    pub last_result: Option<Result<(), MarketError>>,
}

#[derive(Debug)]
pub struct MarketSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub posts: PostApi<SqliteDatabase>,
    pub offers: OfferFlowApi<SqliteDatabase>,
    pub inventory: InventoryApi<SqliteDatabase>,
}

impl MarketWorld {
    pub fn system(&self) -> &MarketSystem {
        self.system.as_ref().expect("Marketplace not initialised")
    }

    pub fn caller(&self, name: &str) -> &Caller {
        self.callers.get(name).unwrap_or_else(|| panic!("{name} has not been registered"))
    }

    pub fn post(&self, description: &str) -> PostId {
        *self.posts.get(description).unwrap_or_else(|| panic!("No post called {description}"))
    }

    pub fn admin(&self) -> Caller {
        Caller::new("admin@reverie.test", "admin", Role::Admin)
    }

    pub fn record<T>(&mut self, result: Result<T, MarketError>) {
        if let Err(e) = &result {
            debug!("🚀️ Step failed with {e}");
        }
        self.last_result = Some(result.map(|_| ()));
    }
}

impl MarketSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let pseudonyms = PseudonymScheme::new([42u8; 32], [7u8; 12]);
        let producers = EventProducers::default();
        let posts = PostApi::new(db.clone(), pseudonyms.clone(), producers.clone());
        let offers = OfferFlowApi::new(db.clone(), pseudonyms, producers);
        let inventory = InventoryApi::new(db.clone());
        Self { db_path: url, db, posts, offers, inventory }
    }

    /// Closes the pool and deletes the scenario's database file. Failed scenarios keep their database for inspection.
    pub async fn tear_down(self, passed: bool) {
        let MarketSystem { db_path, mut db, posts, offers, inventory } = self;
        if !passed {
            error!("🚀️ Scenario failed. Its database is kept at {db_path}");
            return;
        }
        drop((posts, offers, inventory));
        db.close().await;
        match Sqlite::drop_database(&db_path).await {
            Ok(()) => debug!("🚀️ Removed scenario database {db_path}"),
            Err(e) => warn!("🚀️ Could not remove scenario database {db_path}. {e}"),
        }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
