use crate::api::types::Modal;

/// Input events the session understands, pushed by the page.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// The name form was submitted.
    SubmitName(String),
    /// "Let's go" under the cake.
    Begin,
    /// The OK button of a modal or panel.
    Acknowledge(Modal),
    /// The tap fallback for blowing.
    ManualBlow,
    /// The browser refused to autoplay the song.
    AutoplayBlocked,
    /// The user allowed audio from the overlay.
    EnableAudio,
    /// Tap on the birthday card thumbnail.
    ShowCard,
    CloseCard,
    /// Viewport size in CSS pixels.
    Resize { width: f32, height: f32 },
}

/// A queue of input events.
/// JS writes events into the queue; Rust reads and drains them each frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(16),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    /// Iterate over pending events without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_drain_keeps_order() {
        let mut q = InputQueue::new();
        q.push(InputEvent::SubmitName("Ada".into()));
        q.push(InputEvent::Acknowledge(Modal::CloseEyes));
        q.push(InputEvent::ManualBlow);
        assert_eq!(q.len(), 3);
        let events = q.drain();
        assert_eq!(
            events,
            vec![
                InputEvent::SubmitName("Ada".into()),
                InputEvent::Acknowledge(Modal::CloseEyes),
                InputEvent::ManualBlow,
            ]
        );
        assert!(q.is_empty());
    }
}
