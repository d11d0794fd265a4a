use crate::error::NegotiationError;
use std::time::Duration;
use tether_core::RemoteId;
use tokio::sync::watch;

/// The hub's own id on the signaling bus, assigned once the bus connects.
#[derive(Clone)]
pub struct LocalIdentity {
    rx: watch::Receiver<Option<RemoteId>>,
}

/// Writer side of [`LocalIdentity`], held by the signaling connection.
pub struct IdentitySetter {
    tx: watch::Sender<Option<RemoteId>>,
}

pub fn local_identity() -> (IdentitySetter, LocalIdentity) {
    let (tx, rx) = watch::channel(None);
    (IdentitySetter { tx }, LocalIdentity { rx })
}

impl LocalIdentity {
    /// An identity that is already known.
    pub fn fixed(id: impl Into<RemoteId>) -> Self {
        let (_, rx) = watch::channel(Some(id.into()));
        Self { rx }
    }

    pub fn current(&self) -> Option<RemoteId> {
        self.rx.borrow().clone()
    }

    /// Resolve the identity, waiting at most `timeout` for it to be assigned.
    pub async fn wait(&self, timeout: Duration) -> Result<RemoteId, NegotiationError> {
        if let Some(id) = self.current() {
            return Ok(id);
        }

        let mut rx = self.rx.clone();
        let assigned = async move {
            rx.wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|id| id.clone())
        };

        tokio::time::timeout(timeout, assigned)
            .await
            .ok()
            .flatten()
            .ok_or(NegotiationError::IdentityUnavailable)
    }
}

impl IdentitySetter {
    pub fn assign(&self, id: impl Into<RemoteId>) {
        self.tx.send_replace(Some(id.into()));
    }

    /// Forget the identity, e.g. while the bus reconnects.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}
