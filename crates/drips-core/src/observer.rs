//! Observer contract between a search session and its UI layer.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::avatar::AvatarImage;
use crate::search::SearchResultItem;

/// Receives display updates from a search session.
///
/// All callbacks are invoked on the session task, one at a time, in the order
/// the session produced them. Implementations should return quickly.
pub trait SessionObserver: Send + Sync {
    /// The displayed rows were replaced wholesale.
    fn on_items_reset(&self, items: &[SearchResultItem]);

    /// `items` were appended; the first one now sits at `start_index`.
    fn on_items_appended(&self, start_index: usize, items: &[SearchResultItem]);

    /// The badge for the row at `index` is ready.
    fn on_avatar_ready(&self, index: usize, image: AvatarImage);

    /// A fetch failed. The UI owns the retry/cancel prompt.
    fn on_error(&self, message: &str);
}

/// Owned form of an observer callback, for sending across tasks.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ItemsReset {
        items: Vec<SearchResultItem>,
    },
    ItemsAppended {
        start_index: usize,
        items: Vec<SearchResultItem>,
    },
    AvatarReady {
        index: usize,
        #[serde(skip)]
        image: AvatarImage,
    },
    Error {
        message: String,
    },
}

/// Observer that forwards every callback as a [`SessionEvent`] on a channel.
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    /// Create a new observer with the given channel sender
    pub fn new(sender: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { sender }
    }

    /// Create an observer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn forward(&self, event: SessionEvent) {
        // Non-blocking send - if the receiver is dropped, we just skip
        let _ = self.sender.send(event);
    }
}

impl SessionObserver for ChannelObserver {
    fn on_items_reset(&self, items: &[SearchResultItem]) {
        self.forward(SessionEvent::ItemsReset {
            items: items.to_vec(),
        });
    }

    fn on_items_appended(&self, start_index: usize, items: &[SearchResultItem]) {
        self.forward(SessionEvent::ItemsAppended {
            start_index,
            items: items.to_vec(),
        });
    }

    fn on_avatar_ready(&self, index: usize, image: AvatarImage) {
        self.forward(SessionEvent::AvatarReady { index, image });
    }

    fn on_error(&self, message: &str) {
        self.forward(SessionEvent::Error {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::BadgeSize;
    use chrono::Utc;

    #[test]
    fn test_channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::channel();
        let item = SearchResultItem::new("Cat", Utc::now());

        observer.on_items_reset(std::slice::from_ref(&item));
        observer.on_items_appended(1, &[item.clone()]);
        observer.on_avatar_ready(
            0,
            AvatarImage::new("C", BadgeSize::default(), "image/svg+xml", vec![1u8, 2, 3]),
        );
        observer.on_error("boom");

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::ItemsReset { items }) if items.len() == 1));
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionEvent::ItemsAppended { start_index: 1, .. })
        ));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::AvatarReady { index: 0, .. })));
        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Error { message }) if message == "boom"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_observer_tolerates_dropped_receiver() {
        let (observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_error("nobody listening");
    }
}
