use std::time::Duration;

use cucumber::{then, when};
use reverie_common::ResourceVector;
use reverie_engine::{
    db_types::{JobRequestUpdate, Location, NewJobRequest, PostStatus},
    InventoryManagement,
    JobRequestManagement,
    MarketError,
};

use crate::cucumber::MarketWorld;

fn vector(s: &str) -> ResourceVector {
    serde_json::from_str(s).unwrap_or_else(|e| panic!("{s} is not a resource vector. {e}"))
}

fn variant(e: &MarketError) -> &'static str {
    match e {
        MarketError::ValidationError(_) => "ValidationError",
        MarketError::InvalidTransition { .. } => "InvalidTransition",
        MarketError::NotFound(_) => "NotFound",
        MarketError::InsufficientResource { .. } => "InsufficientResource",
        MarketError::AlreadyInitialized(_) => "AlreadyInitialized",
        MarketError::UserAlreadyExists(_) => "UserAlreadyExists",
        MarketError::NotPermitted(_) => "NotPermitted",
        MarketError::StoreError(_) => "StoreError",
        MarketError::StoreTimeout(_) => "StoreTimeout",
        MarketError::PartialCommit { .. } => "PartialCommit",
    }
}

#[when(expr = "{word} posts {string} needing {string}")]
async fn create_post(world: &mut MarketWorld, client: String, description: String, requirements: String) {
    let caller = world.caller(&client).clone();
    let location = Location::new("Dubai Marina", 25.08, 55.14);
    let post = NewJobRequest::new(&description, location, vector(&requirements));
    let result = world.system().posts.create_job_request(&caller, post).await;
    if let Ok(post) = &result {
        world.posts.insert(description, post.id);
    }
    world.record(result);
}

#[when(expr = "{word} changes the requirements of {string} to {string}")]
async fn update_requirements(world: &mut MarketWorld, client: String, post: String, requirements: String) {
    let caller = world.caller(&client).clone();
    let id = world.post(&post);
    let update = JobRequestUpdate::default().with_requirements(vector(&requirements));
    let result = world.system().posts.update_job_request(&caller, id, update).await;
    world.record(result);
}

#[when(expr = "{word} offers {string} on {string}")]
async fn make_offer(world: &mut MarketWorld, vendor: String, content: String, post: String) {
    let caller = world.caller(&vendor).clone();
    let id = world.post(&post);
    let result = world.system().offers.make_offer(&caller, id, vector(&content), 1200.0).await;
    world.record(result);
}

#[when(expr = "{word} retracts their offer on {string}")]
async fn retract_offer(world: &mut MarketWorld, vendor: String, post: String) {
    let caller = world.caller(&vendor).clone();
    let id = world.post(&post);
    let result = world.system().offers.retract_offer(&caller, id).await;
    world.record(result);
}

#[when(expr = "{word} accepts the offer from {word} on {string}")]
async fn accept_offer(world: &mut MarketWorld, client: String, vendor: String, post: String) {
    let caller = world.caller(&client).clone();
    let vendor = world.caller(&vendor).email.clone();
    let id = world.post(&post);
    let offers = &world.system().offers;
    let key = offers.vendor_key(&vendor).expect("Error deriving vendor key");
    let result = offers.accept_offer(&caller, id, &key).await;
    world.record(result);
}

#[when(expr = "{word} rejects the accepted offer from {word} on {string}")]
async fn reject_accepted(world: &mut MarketWorld, client: String, vendor: String, post: String) {
    let caller = world.caller(&client).clone();
    let vendor = world.caller(&vendor).email.clone();
    let id = world.post(&post);
    let offers = &world.system().offers;
    let key = offers.vendor_key(&vendor).expect("Error deriving vendor key");
    let result = offers.reject_accepted_offer(&caller, id, &key).await;
    world.record(result);
}

#[when(regex = r#"^(\w+) (activates|deactivates|completes|deletes) "([^"]*)"$"#)]
async fn change_status(world: &mut MarketWorld, client: String, action: String, post: String) {
    let caller = world.caller(&client).clone();
    let id = world.post(&post);
    let posts = &world.system().posts;
    let result = match action.as_str() {
        "activates" => posts.activate(&caller, id).await,
        "deactivates" => posts.deactivate(&caller, id).await,
        "completes" => posts.mark_complete(&caller, id).await,
        "deletes" => posts.delete_job_request(&caller, id).await,
        _ => panic!("Unknown post action: {action}"),
    };
    world.record(result);
}

#[when(expr = "{word} searches open posts for {string}")]
async fn search(world: &mut MarketWorld, vendor: String, categories: String) {
    let caller = world.caller(&vendor).clone();
    let categories = categories.split(',').map(|c| c.trim().to_string()).collect::<Vec<_>>();
    let result = world.system().offers.fetch_open_posts_for_vendor(&caller, &categories, 0).await;
    world.record(result);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut MarketWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then("the request succeeds")]
async fn request_succeeds(world: &mut MarketWorld) {
    match world.last_result.as_ref().expect("No request was made") {
        Ok(()) => {},
        Err(e) => panic!("Expected success, but got {e}"),
    }
}

#[then(expr = "the request fails with {word}")]
async fn request_fails(world: &mut MarketWorld, expected: String) {
    match world.last_result.as_ref().expect("No request was made") {
        Ok(()) => panic!("Expected {expected}, but the request succeeded"),
        Err(e) => assert_eq!(variant(e), expected, "Unexpected error: {e}"),
    }
}

#[then(expr = "{string} requires {string}")]
async fn check_requirements(world: &mut MarketWorld, post: String, expected: String) {
    let id = world.post(&post);
    let post = world.system().db.fetch_post(id).await.expect("Error fetching post").expect("Post does not exist");
    assert_eq!(post.requirements, vector(&expected), "Requirements are incorrect");
}

#[then(expr = "{string} is {word}")]
async fn check_status(world: &mut MarketWorld, post: String, status: String) {
    let id = world.post(&post);
    let expected = status.parse::<PostStatus>().expect("Not a valid status");
    let post = world.system().db.fetch_post(id).await.expect("Error fetching post").expect("Post does not exist");
    assert_eq!(post.status, expected);
}

#[then(expr = "{string} has {int} pending and {int} accepted offers")]
async fn check_offer_counts(world: &mut MarketWorld, post: String, pending: usize, accepted: usize) {
    let id = world.post(&post);
    let post = world.system().db.fetch_post(id).await.expect("Error fetching post").expect("Post does not exist");
    assert_eq!(post.pending.len(), pending, "Pending offers: {:?}", post.pending);
    assert_eq!(post.accepted.len(), accepted, "Accepted offers: {:?}", post.accepted);
}

#[then(expr = "{word} has stock {string}")]
async fn check_stock(world: &mut MarketWorld, vendor: String, expected: String) {
    let email = world.caller(&vendor).email.clone();
    let stock = world.system().db.fetch_inventory(&email).await.expect("Error fetching stock").expect("No inventory");
    assert_eq!(stock, vector(&expected), "Stock of {vendor} is incorrect");
}
