//! Events emitted by the bot while it runs

use std::time::Instant;

use super::state::{DetectedState, RunSummary};
use crate::input::ClickStyle;
use crate::region::Point;
use crate::vision::Verdict;

/// Something the bot saw or did
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// A cue was classified (never emitted for idle polls)
    Detected {
        detected: DetectedState,
        timestamp: Instant,
    },
    /// The color check reached a verdict
    Verdict(Verdict),
    /// A click was delivered
    Clicked { at: Point, style: ClickStyle },
    /// The run ended
    Stopped(RunSummary),
}

impl BotEvent {
    pub fn detected(detected: DetectedState) -> Self {
        BotEvent::Detected {
            detected,
            timestamp: Instant::now(),
        }
    }
}

/// Callback type for bot events
pub type EventCallback = Box<dyn Fn(&BotEvent) + Send + Sync>;

/// Event handler that can have multiple listeners
pub struct EventHandler {
    callbacks: Vec<EventCallback>,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Add a listener
    pub fn on_event(&mut self, callback: EventCallback) {
        self.callbacks.push(callback);
    }

    /// Emit an event to all listeners
    pub fn emit(&self, event: &BotEvent) {
        for callback in &self.callbacks {
            callback(event);
        }
    }

    /// Check if there are any listeners
    pub fn has_listeners(&self) -> bool {
        !self.callbacks.is_empty()
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_emit_reaches_every_listener() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut handler = EventHandler::new();
        assert!(!handler.has_listeners());

        for _ in 0..2 {
            let count = Arc::clone(&count);
            handler.on_event(Box::new(move |event: &BotEvent| {
                if let BotEvent::Clicked { .. } = event {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        handler.emit(&BotEvent::Clicked {
            at: Point::new(1, 2),
            style: ClickStyle::Double,
        });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
