use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use reverie_engine::{
    events::EventProducers,
    EngineConfig,
    InventoryApi,
    MarketplaceDatabase,
    NotificationApi,
    OfferFlowApi,
    PostApi,
    PseudonymScheme,
    SqliteDatabase,
    UserApi,
};

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    integrations::notifications::create_notification_event_handlers,
    routes::{
        health,
        AcceptOfferRoute,
        ActivatePostRoute,
        CompletePostRoute,
        CreatePostRoute,
        DeactivatePostRoute,
        DeletePostRoute,
        InitializeInventoryRoute,
        MakeOfferRoute,
        MarkNotificationReadRoute,
        MarketPostRoute,
        MarketRoute,
        MeRoute,
        MyInventoryRoute,
        MyOffersRoute,
        MyPostsRoute,
        NotificationsRoute,
        PostByIdRoute,
        RegisterUserRoute,
        RejectAcceptedOfferRoute,
        RejectOfferRoute,
        RequestOfferChangeRoute,
        RetractOfferRoute,
        UnreadNotificationsRoute,
        UpdatePostRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let notifications = NotificationApi::new(db.clone()).with_config(config.engine_config());
    let handlers = create_notification_event_handlers(notifications, config.event_buffer_size);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let state = AppState {
        db,
        pseudonyms: config.crypto.pseudonym_scheme()?,
        producers,
        engine: config.engine_config(),
        verifier: TokenVerifier::new(&config.auth),
    };
    let srv = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("reverie::access_log"))
            .service(health)
            .configure(move |cfg| configure_api(cfg, state))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Everything a worker needs to build the engine APIs.
#[derive(Clone)]
pub struct AppState<B> {
    pub db: B,
    pub pseudonyms: PseudonymScheme,
    pub producers: EventProducers,
    pub engine: EngineConfig,
    pub verifier: TokenVerifier,
}

/// Registers the engine APIs and every `/api` route on `cfg`.
pub fn configure_api<B: MarketplaceDatabase + 'static>(cfg: &mut web::ServiceConfig, state: AppState<B>) {
    let AppState { db, pseudonyms, producers, engine, verifier } = state;
    let posts = PostApi::new(db.clone(), pseudonyms.clone(), producers.clone()).with_config(engine);
    let offers = OfferFlowApi::new(db.clone(), pseudonyms, producers).with_config(engine);
    let inventory = InventoryApi::new(db.clone()).with_config(engine);
    let users = UserApi::new(db.clone()).with_config(engine);
    let notifications = NotificationApi::new(db).with_config(engine);
    cfg.app_data(web::Data::new(posts))
        .app_data(web::Data::new(offers))
        .app_data(web::Data::new(inventory))
        .app_data(web::Data::new(users))
        .app_data(web::Data::new(notifications))
        .app_data(web::Data::new(verifier));
    let api_scope = web::scope("/api")
        .service(RegisterUserRoute::<B>::new())
        .service(MeRoute::<B>::new())
        .service(InitializeInventoryRoute::<B>::new())
        .service(MyInventoryRoute::<B>::new())
        .service(CreatePostRoute::<B>::new())
        .service(MyPostsRoute::<B>::new())
        .service(PostByIdRoute::<B>::new())
        .service(UpdatePostRoute::<B>::new())
        .service(ActivatePostRoute::<B>::new())
        .service(DeactivatePostRoute::<B>::new())
        .service(CompletePostRoute::<B>::new())
        .service(DeletePostRoute::<B>::new())
        .service(AcceptOfferRoute::<B>::new())
        .service(RejectOfferRoute::<B>::new())
        .service(RejectAcceptedOfferRoute::<B>::new())
        .service(RequestOfferChangeRoute::<B>::new())
        .service(MarketRoute::<B>::new())
        .service(MarketPostRoute::<B>::new())
        .service(MakeOfferRoute::<B>::new())
        .service(RetractOfferRoute::<B>::new())
        .service(MyOffersRoute::<B>::new())
        .service(UnreadNotificationsRoute::<B>::new())
        .service(NotificationsRoute::<B>::new())
        .service(MarkNotificationReadRoute::<B>::new());
    cfg.service(api_scope);
}
