use log::*;
use reverie_engine::{
    events::{EventHandlers, EventHooks},
    NotificationApi,
    SqliteDatabase,
};

/// Connects the engine's events to the notification feeds.
///
/// 1. OfferEvent - the other party of the offer gets a notification: the post owner for new and retracted offers,
///    the vendor for acceptances, rejections and change requests.
/// 2. PostStatusChangedEvent - every vendor with an accepted offer on the post gets a notification.
///
/// Handlers run after the change has been committed. A failure to store a notification is logged and never undoes
/// the change.
pub fn create_notification_event_handlers(api: NotificationApi<SqliteDatabase>, buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let api_clone = api.clone();
    // --- On Offer Handler ---
    hooks.on_offer(move |ev| {
        trace!("📬️ Offer event on post {}", ev.post().id);
        let api = api_clone.clone();
        Box::pin(async move { api.handle_offer_event(ev).await })
    });
    // --- On PostStatusChanged Handler ---
    hooks.on_status_changed(move |ev| {
        trace!("📬️ Post {} is now {}", ev.post.id, ev.new_status);
        let api = api.clone();
        Box::pin(async move { api.handle_status_event(ev).await })
    });
    EventHandlers::new(buffer_size, hooks)
}
