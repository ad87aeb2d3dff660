use crossbeam_channel::{Receiver, Sender, unbounded};

/// Observable fields of a running slide-show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackField {
    State,
    CurrentSegmentIndex,
    CurrentSegmentElapsedTime,
    CurrentPauseDuration,
    TotalPauseDuration,
    CurrentImage,
    LastUsedImage,
    SegmentImageIndex,
}

impl PlaybackField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::CurrentSegmentIndex => "current-segment-index",
            Self::CurrentSegmentElapsedTime => "current-segment-elapsed-time",
            Self::CurrentPauseDuration => "current-pause-duration",
            Self::TotalPauseDuration => "total-pause-duration",
            Self::CurrentImage => "current-image",
            Self::LastUsedImage => "last-used-image",
            Self::SegmentImageIndex => "segment-image-index",
        }
    }
}

/// Fan-out of field-change notices to any number of channel subscribers.
///
/// Subscribers whose receiver was dropped are forgotten on the next notice.
#[derive(Debug)]
pub struct Notifier<F> {
    subscribers: Vec<Sender<F>>,
}

impl<F> Default for Notifier<F> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<F: Copy> Notifier<F> {
    pub fn subscribe(&mut self) -> Receiver<F> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn notify(&mut self, field: F) {
        self.subscribers.retain(|tx| tx.send(field).is_ok());
    }

    pub fn notify_all(&mut self, fields: &[F]) {
        for field in fields {
            self.notify(*field);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
