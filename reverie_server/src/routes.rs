//! Request handler definitions
//!
//! Define each route and its handler here. Handlers do no more than extract the caller and the arguments, call one
//! engine API method and serialize the result. Business rules belong in the engine.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every engine call is async and bounded by the store timeout, so
//! handlers must simply `.await` them.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use reverie_common::ResourceVector;
use reverie_engine::{
    db_types::{JobRequestUpdate, NewJobRequest, NewUser, PostId, Role, VendorKey},
    InventoryApi,
    MarketplaceDatabase,
    NotificationApi,
    OfferFlowApi,
    PostApi,
    UserApi,
};

use crate::{
    auth::JwtClaims,
    data_objects::{JsonResponse, MarketQuery, OfferRequest, PageQuery},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $bound:ident where requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $bound + 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),*]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Users  ----------------------------------------------------
route!(register_user => Post "/users" impl MarketplaceDatabase where requires [Role::Admin]);
pub async fn register_user<B: MarketplaceDatabase>(
    claims: JwtClaims,
    body: web::Json<NewUser>,
    api: web::Data<UserApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST register user {}", body.email);
    let user = api.register_user(&claims.caller(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

route!(me => Get "/me" impl MarketplaceDatabase where requires []);
/// The registered profile of the caller named in the access token.
pub async fn me<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<UserApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET me for {}", claims.sub);
    let user = api
        .fetch_user(&claims.sub)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("{} is not a registered user", claims.sub)))?;
    Ok(HttpResponse::Ok().json(user))
}

//----------------------------------------------   Inventory  ----------------------------------------------------
route!(initialize_inventory => Post "/vendors/{email}/inventory" impl MarketplaceDatabase where requires [Role::Admin]);
pub async fn initialize_inventory<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<ResourceVector>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let vendor = path.into_inner();
    debug!("💻️ POST initial inventory for {vendor}");
    let balance = api.initialize_vendor_inventory(&claims.caller(), &vendor, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(balance))
}

route!(my_inventory => Get "/inventory" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn my_inventory<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET inventory for {}", claims.sub);
    let balance = api.inventory_for(&claims.caller()).await?;
    Ok(HttpResponse::Ok().json(balance))
}

//----------------------------------------------   Posts (client)  ---------------------------------------------------
route!(create_post => Post "/posts" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn create_post<B: MarketplaceDatabase>(
    claims: JwtClaims,
    body: web::Json<NewJobRequest>,
    api: web::Data<PostApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST new post from {}", claims.sub);
    let post = api.create_job_request(&claims.caller(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

route!(my_posts => Get "/posts" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn my_posts<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<PostApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET posts for {}", claims.sub);
    let posts = api.fetch_posts_owned_by_client(&claims.caller()).await?;
    Ok(HttpResponse::Ok().json(posts))
}

route!(post_by_id => Get "/posts/{id}" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn post_by_id<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    api: web::Data<PostApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET post {id} for {}", claims.sub);
    let post = api.fetch_post_for_owner(&claims.caller(), id).await?;
    Ok(HttpResponse::Ok().json(post))
}

route!(update_post => Patch "/posts/{id}" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn update_post<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    body: web::Json<JobRequestUpdate>,
    api: web::Data<PostApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH post {id}");
    let post = api.update_job_request(&claims.caller(), id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

route!(activate_post => Post "/posts/{id}/activate" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn activate_post<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    api: web::Data<PostApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ POST activate post {id}");
    let post = api.activate(&claims.caller(), id).await?;
    Ok(HttpResponse::Ok().json(post))
}

route!(deactivate_post => Post "/posts/{id}/deactivate" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn deactivate_post<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    api: web::Data<PostApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ POST deactivate post {id}");
    let post = api.deactivate(&claims.caller(), id).await?;
    Ok(HttpResponse::Ok().json(post))
}

route!(complete_post => Post "/posts/{id}/complete" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn complete_post<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    api: web::Data<PostApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ POST complete post {id}");
    let post = api.mark_complete(&claims.caller(), id).await?;
    Ok(HttpResponse::Ok().json(post))
}

route!(delete_post => Delete "/posts/{id}" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn delete_post<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    api: web::Data<PostApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE post {id}");
    let post = api.delete_job_request(&claims.caller(), id).await?;
    Ok(HttpResponse::Ok().json(post))
}

//----------------------------------------------   Offers (client)  --------------------------------------------------
route!(accept_offer => Post "/posts/{id}/offers/{key}/accept" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn accept_offer<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<(PostId, VendorKey)>,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (id, key) = path.into_inner();
    debug!("💻️ POST accept offer {key} on post {id}");
    let offer = api.accept_offer(&claims.caller(), id, &key).await?;
    Ok(HttpResponse::Ok().json(offer))
}

route!(reject_offer => Post "/posts/{id}/offers/{key}/reject" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn reject_offer<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<(PostId, VendorKey)>,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (id, key) = path.into_inner();
    debug!("💻️ POST reject pending offer {key} on post {id}");
    let offer = api.reject_pending_offer(&claims.caller(), id, &key).await?;
    Ok(HttpResponse::Ok().json(offer))
}

route!(reject_accepted_offer => Post "/posts/{id}/accepted/{key}/reject" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn reject_accepted_offer<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<(PostId, VendorKey)>,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (id, key) = path.into_inner();
    debug!("💻️ POST reject accepted offer {key} on post {id}");
    let offer = api.reject_accepted_offer(&claims.caller(), id, &key).await?;
    Ok(HttpResponse::Ok().json(offer))
}

route!(request_offer_change => Post "/posts/{id}/offers/{key}/change" impl MarketplaceDatabase where requires [Role::Client]);
pub async fn request_offer_change<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<(PostId, VendorKey)>,
    body: web::Json<ResourceVector>,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (id, key) = path.into_inner();
    debug!("💻️ POST change request for offer {key} on post {id}");
    api.request_offer_change(&claims.caller(), id, &key, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("The vendor has been asked to change their offer")))
}

//----------------------------------------------   Market (vendor)  --------------------------------------------------
route!(market => Get "/market" impl MarketplaceDatabase where requires [Role::Vendor]);
/// Open posts needing any of the categories in `items`. Unknown category names are a 400.
pub async fn market<B: MarketplaceDatabase>(
    claims: JwtClaims,
    query: web::Query<MarketQuery>,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET market for {} with {:?}", claims.sub, query);
    let posts = api.fetch_open_posts_for_vendor(&claims.caller(), &query.categories(), query.page).await?;
    Ok(HttpResponse::Ok().json(posts))
}

route!(market_post => Get "/market/{id}" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn market_post<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET market post {id} for {}", claims.sub);
    let view = api.fetch_post_for_vendor(&claims.caller(), id).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(make_offer => Post "/market/{id}/offer" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn make_offer<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    body: web::Json<OfferRequest>,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let OfferRequest { content, rate } = body.into_inner();
    debug!("💻️ POST offer of {content} on post {id} from {}", claims.sub);
    let offer = api.make_offer(&claims.caller(), id, content, rate).await?;
    Ok(HttpResponse::Created().json(offer))
}

route!(retract_offer => Delete "/market/{id}/offer" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn retract_offer<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<PostId>,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE offer on post {id} from {}", claims.sub);
    let response = if api.retract_offer(&claims.caller(), id).await? {
        JsonResponse::success("Offer retracted")
    } else {
        JsonResponse::failure("There was no pending offer to retract")
    };
    Ok(HttpResponse::Ok().json(response))
}

route!(my_offers => Get "/offers" impl MarketplaceDatabase where requires [Role::Vendor]);
pub async fn my_offers<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<OfferFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET offers for {}", claims.sub);
    let offers = api.fetch_offers_for_vendor(&claims.caller()).await?;
    Ok(HttpResponse::Ok().json(offers))
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(notifications => Get "/notifications" impl MarketplaceDatabase where requires []);
pub async fn notifications<B: MarketplaceDatabase>(
    claims: JwtClaims,
    query: web::Query<PageQuery>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET notifications for {}", claims.sub);
    let feed = api.fetch_notifications(&claims.caller(), query.page).await?;
    Ok(HttpResponse::Ok().json(feed))
}

route!(unread_notifications => Get "/notifications/unread" impl MarketplaceDatabase where requires []);
pub async fn unread_notifications<B: MarketplaceDatabase>(
    claims: JwtClaims,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET unread notifications for {}", claims.sub);
    let feed = api.fetch_unread(&claims.caller()).await?;
    Ok(HttpResponse::Ok().json(feed))
}

route!(mark_notification_read => Post "/notifications/{id}/read" impl MarketplaceDatabase where requires []);
pub async fn mark_notification_read<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ POST read notification {id} for {}", claims.sub);
    let notification = api.mark_read(&claims.caller(), id).await?;
    Ok(HttpResponse::Ok().json(notification))
}
