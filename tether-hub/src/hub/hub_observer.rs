use crate::hub::{HubContext, HubEvent};
use async_trait::async_trait;

/// Subscriber to hub notifications, e.g. a UI or a diagnostics trail.
///
/// Called on the hub's event loop; keep it quick.
#[async_trait]
pub trait HubObserver: Send + Sync + 'static {
    async fn on_event(&self, ctx: &HubContext, event: HubEvent);
}

/// Forwards each event to several observers in order.
#[derive(Default)]
pub struct Observers(Vec<Box<dyn HubObserver>>);

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: impl HubObserver) -> Self {
        self.0.push(Box::new(observer));
        self
    }
}

#[async_trait]
impl HubObserver for Observers {
    async fn on_event(&self, ctx: &HubContext, event: HubEvent) {
        for observer in &self.0 {
            observer.on_event(ctx, event.clone()).await;
        }
    }
}
