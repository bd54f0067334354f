use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OfferEvent, PostStatusChangedEvent};

/// The publishing side of the configured hooks. Cheap to clone into every API instance.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub offer_producer: Vec<EventProducer<OfferEvent>>,
    pub status_changed_producer: Vec<EventProducer<PostStatusChangedEvent>>,
}

impl EventProducers {
    pub fn publish_offer_event(&self, event: OfferEvent) {
        for producer in &self.offer_producer {
            producer.publish_event(event.clone());
        }
    }

    pub fn publish_status_changed(&self, event: PostStatusChangedEvent) {
        for producer in &self.status_changed_producer {
            producer.publish_event(event.clone());
        }
    }
}

pub struct EventHandlers {
    pub on_offer: Option<EventHandler<OfferEvent>>,
    pub on_status_changed: Option<EventHandler<PostStatusChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_offer = hooks.on_offer.map(|f| EventHandler::new(buffer_size, f));
        let on_status_changed = hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_offer, on_status_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_offer {
            result.offer_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_offer {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_offer: Option<Handler<OfferEvent>>,
    pub on_status_changed: Option<Handler<PostStatusChangedEvent>>,
}

impl EventHooks {
    pub fn on_offer<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OfferEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_offer = Some(Arc::new(f));
        self
    }

    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PostStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f));
        self
    }
}
