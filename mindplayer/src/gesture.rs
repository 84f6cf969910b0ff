//! User input gestures that unlock playback

use crate::listeners::{ListenerId, Listeners};
use std::fmt;
use std::sync::Arc;

/// User intent signals accepted to start deferred playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Click,
    TouchStart,
    KeyDown,
}

impl GestureKind {
    pub const ALL: [GestureKind; 3] = [GestureKind::Click, GestureKind::TouchStart, GestureKind::KeyDown];
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GestureKind::Click => "click",
            GestureKind::TouchStart => "touchstart",
            GestureKind::KeyDown => "keydown",
        })
    }
}

pub type GestureListener = Arc<dyn Fn(GestureKind) + Send + Sync>;

/// Document-level source of user gestures
pub trait GestureSource: Send + Sync {
    fn add_listener(&self, kind: GestureKind, listener: GestureListener) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// In-process gesture source: hosts push gestures with [`GestureBus::dispatch`]
#[derive(Default)]
pub struct GestureBus {
    listeners: Listeners<GestureKind>,
}

impl GestureBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self, kind: GestureKind) {
        self.listeners.emit(&kind);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl GestureSource for GestureBus {
    fn add_listener(&self, kind: GestureKind, listener: GestureListener) -> ListenerId {
        self.listeners.register(Arc::new(move |event: &GestureKind| {
            if *event == kind {
                listener(kind);
            }
        }))
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.unregister(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_listener_only_sees_its_kind() {
        let bus = GestureBus::new();
        let clicks = Arc::new(AtomicUsize::new(0));

        let c = clicks.clone();
        let id = bus.add_listener(
            GestureKind::Click,
            Arc::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.dispatch(GestureKind::KeyDown);
        bus.dispatch(GestureKind::Click);
        assert_eq!(clicks.load(Ordering::SeqCst), 1);

        bus.remove_listener(id);
        bus.dispatch(GestureKind::Click);
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
