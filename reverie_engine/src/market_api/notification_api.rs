use std::fmt::Debug;

use log::*;
use reverie_common::ResourceVector;

use crate::{
    db_types::{Caller, NewNotification, Notification, NotificationType, PostId, PostStatus},
    events::{OfferEvent, PostRef, PostStatusChangedEvent},
    helpers::with_store_timeout,
    market_api::{guards::page_offset, EngineConfig, MarketError},
    traits::NotificationManagement,
};

/// The messages the marketplace sends. Each variant carries its own arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageTemplate {
    OfferMade { vendor_name: String, post: String },
    OfferRetracted { vendor_name: String, post: String },
    OfferAccepted { post: String },
    OfferRejected { post: String },
    ChangesRequested { post: String, desired: ResourceVector },
    StatusChanged { post: String, status: PostStatus },
}

impl MessageTemplate {
    pub fn render(&self) -> String {
        match self {
            MessageTemplate::OfferMade { vendor_name, post } => {
                format!("{vendor_name} made an offer to your post {post}")
            },
            MessageTemplate::OfferRetracted { vendor_name, post } => {
                format!("{vendor_name} retracted their offer from your post {post}")
            },
            MessageTemplate::OfferAccepted { post } => format!("Your offer on post {post} has been accepted"),
            MessageTemplate::OfferRejected { post } => format!("Your offer on post {post} has been rejected"),
            MessageTemplate::ChangesRequested { post, .. } => format!("Changes requested on post {post}"),
            MessageTemplate::StatusChanged { post, status } => match status {
                PostStatus::Ongoing => {
                    format!("Work on post {post} has started. Kindly deliver your equipments soon.")
                },
                PostStatus::Open => format!("Work on post {post} is temporarily halted"),
                PostStatus::Completed => format!("Post {post} has completed successfully"),
                PostStatus::Deleted => format!("Post {post} has been deleted"),
            },
        }
    }

    pub fn kind(&self) -> NotificationType {
        match self {
            MessageTemplate::ChangesRequested { .. } => NotificationType::RequestOfferChange,
            _ => NotificationType::Info,
        }
    }

    pub fn desired_content(&self) -> Option<ResourceVector> {
        match self {
            MessageTemplate::ChangesRequested { desired, .. } => Some(*desired),
            _ => None,
        }
    }
}

fn post_title(post: &PostRef) -> String {
    format!("\"{}\"", post.description)
}

/// Per-user notification feeds, and the event handlers that fill them.
#[derive(Clone)]
pub struct NotificationApi<B> {
    db: B,
    config: EngineConfig,
}

impl<B> Debug for NotificationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi")
    }
}

impl<B> NotificationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, config: EngineConfig::default() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B> NotificationApi<B>
where B: NotificationManagement
{
    /// Renders `template` and stores it in the feed of `recipient`.
    pub async fn notify(
        &self,
        recipient: &str,
        post_id: PostId,
        template: MessageTemplate,
    ) -> Result<Notification, MarketError> {
        let mut stored = self.notify_all(vec![(recipient.to_string(), post_id, template)]).await?;
        stored.pop().ok_or_else(|| MarketError::StoreError("The notification was not stored".into()))
    }

    async fn notify_all(&self, batch: Vec<(String, PostId, MessageTemplate)>) -> Result<Vec<Notification>, MarketError> {
        let batch = batch
            .into_iter()
            .map(|(recipient, post_id, template)| NewNotification {
                recipient,
                post_id,
                kind: template.kind(),
                message: template.render(),
                desired_content: template.desired_content(),
            })
            .collect::<Vec<_>>();
        with_store_timeout(self.config.store_timeout, self.db.insert_notifications(batch)).await
    }

    /// Turns an offer event into a notification for the other party. Failures are logged and swallowed.
    pub async fn handle_offer_event(&self, event: OfferEvent) {
        let post = event.post().clone();
        let title = post_title(&post);
        let (recipient, template) = match event {
            OfferEvent::Made { vendor_name, .. } => {
                (post.owner.clone(), MessageTemplate::OfferMade { vendor_name, post: title })
            },
            OfferEvent::Retracted { vendor_name, .. } => {
                (post.owner.clone(), MessageTemplate::OfferRetracted { vendor_name, post: title })
            },
            OfferEvent::Accepted { vendor, .. } => (vendor, MessageTemplate::OfferAccepted { post: title }),
            OfferEvent::Rejected { vendor, .. } => (vendor, MessageTemplate::OfferRejected { post: title }),
            OfferEvent::ChangeRequested { vendor, desired, .. } => {
                (vendor, MessageTemplate::ChangesRequested { post: title, desired })
            },
        };
        match self.notify(&recipient, post.id, template).await {
            Ok(n) => debug!("📬️ Notification {} sent to {recipient}", n.id),
            Err(e) => error!("📬️ Could not notify {recipient} about post {}. {e}", post.id),
        }
    }

    /// Tells every vendor with an accepted offer that the post changed status. Failures are logged and swallowed.
    pub async fn handle_status_event(&self, event: PostStatusChangedEvent) {
        if event.vendors.is_empty() {
            trace!("📬️ Post {} changed status with no vendors to notify", event.post.id);
            return;
        }
        let title = post_title(&event.post);
        let batch = event
            .vendors
            .iter()
            .map(|vendor| {
                let template = MessageTemplate::StatusChanged { post: title.clone(), status: event.new_status };
                (vendor.clone(), event.post.id, template)
            })
            .collect();
        match self.notify_all(batch).await {
            Ok(stored) => debug!("📬️ {} vendors notified that post {} is {}", stored.len(), event.post.id, event.new_status),
            Err(e) => error!("📬️ Could not notify vendors that post {} is {}. {e}", event.post.id, event.new_status),
        }
    }

    pub async fn fetch_unread(&self, caller: &Caller) -> Result<Vec<Notification>, MarketError> {
        let page_size = self.config.notification_page_size;
        with_store_timeout(self.config.store_timeout, self.db.fetch_notifications(&caller.email, true, 0, page_size))
            .await
    }

    /// One page of the caller's feed, newest first. `page` is zero-based.
    pub async fn fetch_notifications(&self, caller: &Caller, page: i64) -> Result<Vec<Notification>, MarketError> {
        let page_size = self.config.notification_page_size;
        page_offset(page, page_size)?;
        with_store_timeout(
            self.config.store_timeout,
            self.db.fetch_notifications(&caller.email, false, page, page_size),
        )
        .await
    }

    pub async fn mark_read(&self, caller: &Caller, id: i64) -> Result<Notification, MarketError> {
        with_store_timeout(self.config.store_timeout, self.db.mark_notification_read(&caller.email, id)).await
    }
}
