use std::sync::Arc;

use tokio::sync::watch;

/// Scheduler policy for reconnect attempts: "may we attempt now?".
///
/// Mirrors host-tab visibility without any browser coupling - the
/// embedding layer flips it from its own visibility events, and tests
/// flip it directly. While hidden, all reconnect attempts are deferred;
/// a hidden-to-visible transition while disconnected resets the attempt
/// counter and retries immediately.
#[derive(Clone)]
pub struct Visibility {
    tx: Arc<watch::Sender<bool>>,
}

impl Visibility {
    pub fn new(visible: bool) -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(visible)),
        }
    }

    pub fn set_visible(&self, visible: bool) {
        self.tx.send_replace(visible);
    }

    pub fn is_visible(&self) -> bool {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_visibility_changes_reach_subscribers() {
        let visibility = Visibility::new(true);
        let mut rx = visibility.subscribe();
        assert!(visibility.is_visible());

        visibility.set_visible(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());

        visibility.set_visible(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}
