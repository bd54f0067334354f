use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use log::*;
use reverie_common::{Category, ResourceVector};
use reverie_engine::{
    db_types::{Caller, Location, NewJobRequest, PostStatus, Role},
    events::{EventHandlers, EventHooks, OfferEvent},
    test_utils::prepare_env::{fresh_database, seed_user, seed_vendor},
    MarketplaceDatabase,
    OfferFlowApi,
    PostApi,
    PseudonymScheme,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::runtime::Runtime;

async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    Sqlite::drop_database(&url).await.unwrap();
}

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

fn new_post(requirements: ResourceVector) -> NewJobRequest {
    NewJobRequest::new("Harbour works", Location::new("Jebel Ali", 25.0, 55.06), requirements)
}

#[test]
fn offer_hooks_fire_after_commit() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let made = HookCalled::default();
    let accepted = HookCalled::default();
    let (made_copy, accepted_copy) = (made.clone(), accepted.clone());
    rt.block_on(async move {
        let db = fresh_database().await;
        let mut hooks = EventHooks::default();
        hooks.on_offer(move |ev| {
            info!("🪝️ {ev:?}");
            match ev {
                OfferEvent::Made { .. } => made_copy.called(),
                OfferEvent::Accepted { .. } => accepted_copy.called(),
                _ => {},
            }
            Box::pin(async {})
        });
        let handlers = EventHandlers::new(16, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        seed_user(&db, "client@reverie.test", Role::Client).await;
        seed_vendor(&db, "vendor@reverie.test", ResourceVector::zero().with(Category::Crane, 2)).await;
        let client = Caller::new("client@reverie.test", "client", Role::Client);
        let vendor = Caller::new("vendor@reverie.test", "Heavy Lift LLC", Role::Vendor);
        let pseudonyms = PseudonymScheme::new([1u8; 32], [2u8; 12]);
        let posts = PostApi::new(db.clone(), pseudonyms.clone(), producers.clone());
        let offers = OfferFlowApi::new(db.clone(), pseudonyms, producers);

        let post = posts.create_job_request(&client, new_post(ResourceVector::zero().with(Category::Crane, 2))).await.unwrap();
        let content = ResourceVector::zero().with(Category::Crane, 1);
        offers.make_offer(&vendor, post.id, content, 900.0).await.unwrap();
        // A rejected offer publishes nothing
        let too_much = ResourceVector::zero().with(Category::Crane, 3);
        assert!(offers.make_offer(&vendor, post.id, too_much, 900.0).await.is_err());
        let key = offers.vendor_key(&vendor.email).unwrap();
        offers.accept_offer(&client, post.id, &key).await.unwrap();
        drop(posts);
        drop(offers);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        tear_down(db).await;
    });
    assert_eq!(made.count(), 1);
    assert_eq!(accepted.count(), 1);
    info!("🪝️ test complete");
}

#[test]
fn status_hooks_name_the_accepted_vendors() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let event_copy = event.clone();
    rt.block_on(async move {
        let db = fresh_database().await;
        let mut hooks = EventHooks::default();
        hooks.on_status_changed(move |ev| {
            info!("🪝️ {ev:?}");
            assert_eq!(ev.old_status, PostStatus::Open);
            assert_eq!(ev.new_status, PostStatus::Ongoing);
            assert_eq!(ev.vendors, vec!["vendor@reverie.test".to_string()]);
            event_copy.called();
            Box::pin(async {})
        });
        let handlers = EventHandlers::new(16, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;

        seed_user(&db, "client@reverie.test", Role::Client).await;
        seed_vendor(&db, "vendor@reverie.test", ResourceVector::zero().with(Category::Truck, 4)).await;
        let client = Caller::new("client@reverie.test", "client", Role::Client);
        let vendor = Caller::new("vendor@reverie.test", "Sand Movers", Role::Vendor);
        let pseudonyms = PseudonymScheme::new([1u8; 32], [2u8; 12]);
        let posts = PostApi::new(db.clone(), pseudonyms.clone(), producers.clone());
        let offers = OfferFlowApi::new(db.clone(), pseudonyms, producers);

        let post = posts.create_job_request(&client, new_post(ResourceVector::zero().with(Category::Truck, 4))).await.unwrap();
        offers.make_offer(&vendor, post.id, ResourceVector::zero().with(Category::Truck, 4), 300.0).await.unwrap();
        let key = offers.vendor_key(&vendor.email).unwrap();
        offers.accept_offer(&client, post.id, &key).await.unwrap();
        posts.activate(&client, post.id).await.unwrap();
        // Not a valid transition, so no event
        assert!(posts.delete_job_request(&client, post.id).await.is_err());
        drop(posts);
        drop(offers);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        tear_down(db).await;
    });
    assert_eq!(event.count(), 1);
    info!("🪝️ test complete");
}
