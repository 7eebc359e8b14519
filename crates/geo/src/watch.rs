//! Continuous location subscription.

use crate::position::Position;
use crate::source::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Handle to a running position subscription.
///
/// Cancelling is idempotent and also happens on drop.
pub struct LocationWatch {
    rx: mpsc::Receiver<Result<Position>>,
    cancel: CancellationToken,
}

impl LocationWatch {
    /// Wrap a channel fed by a backend task that honors `cancel`.
    pub fn new(rx: mpsc::Receiver<Result<Position>>, cancel: CancellationToken) -> Self {
        Self { rx, cancel }
    }

    /// Next reading, or `None` once the subscription has ended or was cancelled.
    pub async fn next(&mut self) -> Option<Result<Position>> {
        if self.cancel.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            item = self.rx.recv() => item,
        }
    }

    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("location watch cancelled");
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for LocationWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for LocationWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationWatch")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (tx, rx) = mpsc::channel(4);
        let mut watch = LocationWatch::new(rx, CancellationToken::new());

        tx.send(Ok(Position::new(1.0, 2.0))).await.unwrap();
        assert!(watch.next().await.unwrap().is_ok());

        watch.cancel();
        watch.cancel();
        assert!(watch.is_cancelled());

        tx.send(Ok(Position::new(3.0, 4.0))).await.unwrap();
        assert!(watch.next().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_cancels_backend_token() {
        let (_tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let watch = LocationWatch::new(rx, token.clone());

        drop(watch);
        assert!(token.is_cancelled());
    }
}
