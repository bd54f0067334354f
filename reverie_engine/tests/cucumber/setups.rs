use cucumber::given;
use reverie_common::ResourceVector;
use reverie_engine::{
    db_types::{Caller, NewUser, Role},
    UserApi,
};

use crate::cucumber::{market_world::MarketSystem, MarketWorld};

#[given("a fresh marketplace")]
async fn fresh_marketplace(world: &mut MarketWorld) {
    let system = MarketSystem::new().await;
    world.system = Some(system);
}

async fn register(world: &mut MarketWorld, name: &str, role: Role) -> Caller {
    let email = format!("{name}@reverie.test");
    let users = UserApi::new(world.system().db.clone());
    users.register_user(&world.admin(), NewUser::new(&email, name, role)).await.expect("Error registering user");
    let caller = Caller::new(email, name, role);
    world.callers.insert(name.to_string(), caller.clone());
    caller
}

#[given(expr = "a client called {word}")]
async fn client(world: &mut MarketWorld, name: String) {
    register(world, &name, Role::Client).await;
}

#[given(expr = "a vendor called {word} with stock {string}")]
async fn vendor_with_stock(world: &mut MarketWorld, name: String, stock: String) {
    let vendor = register(world, &name, Role::Vendor).await;
    let stock = serde_json::from_str::<ResourceVector>(&stock).expect("Invalid resource vector");
    let admin = world.admin();
    world
        .system()
        .inventory
        .initialize_vendor_inventory(&admin, &vendor.email, stock)
        .await
        .expect("Error initializing inventory");
}
