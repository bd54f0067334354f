//! Bounded pub-sub channel behind the engine's event hooks.
//!
//! A handler owns the receiving end and any number of producers publish into it. Handlers see only the event, never
//! the engine's state, and each event is handled on its own task so a slow hook does not hold up the queue.
//!
//! The handler stops once every producer has been dropped, after the in-flight hooks have finished.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinSet,
};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    // Only used to mint producers. Dropped when the handler starts.
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until the last producer is dropped and every spawned hook has returned.
    pub async fn start_handler(self) {
        let EventHandler { mut receiver, sender, handler } = self;
        drop(sender);
        debug!("📬️ Event handler started");
        let mut running = JoinSet::new();
        loop {
            tokio::select! {
                event = receiver.recv() => match event {
                    Some(ev) => {
                        let hook = Arc::clone(&handler);
                        running.spawn(async move { (hook)(ev).await });
                    },
                    None => break,
                },
                Some(done) = running.join_next(), if !running.is_empty() => log_hook_result(done),
            }
        }
        debug!("📬️ All producers have gone. Waiting for {} hook(s) to finish", running.len());
        while let Some(done) = running.join_next().await {
            log_hook_result(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_hook_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => error!("📬️ An event hook did not complete. {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event for the handler without waiting. If the buffer is full or the handler has gone away, the event
    /// is dropped and the loss is logged. Publishing never fails the caller.
    pub fn publish_event(&self, event: E) {
        match self.sender.try_send(event) {
            Ok(()) => trace!("📬️ Event published"),
            Err(TrySendError::Full(_)) => warn!("📬️ Event buffer is full. An event has been dropped."),
            Err(TrySendError::Closed(_)) => error!("📬️ Event handler has shut down. An event has been dropped."),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    fn summing_handler(total: Arc<AtomicU64>) -> Handler<u64> {
        Arc::new(move |v: u64| {
            let total = total.clone();
            Box::pin(async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
                total.fetch_add(v, Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    #[tokio::test]
    async fn handler_drains_every_producer_before_stopping() {
        let _ = env_logger::try_init();
        let total = Arc::new(AtomicU64::new(0));
        let event_handler = EventHandler::new(16, summing_handler(total.clone()));
        let odds = event_handler.subscribe();
        let evens = event_handler.subscribe();
        tokio::spawn(async move { (0..5).for_each(|i| odds.publish_event(2 * i + 1)) });
        tokio::spawn(async move { (0..5).for_each(|i| evens.publish_event(2 * i)) });
        event_handler.start_handler().await;
        assert_eq!(total.load(Ordering::SeqCst), 45);
    }

    #[tokio::test]
    async fn full_buffer_drops_instead_of_blocking() {
        let total = Arc::new(AtomicU64::new(0));
        let event_handler = EventHandler::new(2, summing_handler(total.clone()));
        let producer = event_handler.subscribe();
        // Nobody is draining the channel yet, so only the first two fit.
        (1..=5).for_each(|i| producer.publish_event(i));
        drop(producer);
        event_handler.start_handler().await;
        assert_eq!(total.load(Ordering::SeqCst), 3);
    }
}
