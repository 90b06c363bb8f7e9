//! Gameplay events and their synchronous publisher.
//!
//! [`EventPublisher`] invokes listeners in registration order as soon as an
//! event is published. [`EventQueue`] is a listener that buffers events for
//! consumers that prefer to drain once per frame.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, PoisonError},
};

use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GameplayEvent {
    Movement(Vec2),
    Jump,
    SprintStart,
    SprintEnd,
    Look(Vec2),
    Interact,
    Pause,
    Resume,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum GameplayEventKind {
    Movement,
    Jump,
    SprintStart,
    SprintEnd,
    Look,
    Interact,
    Pause,
    Resume,
}

impl GameplayEvent {
    pub fn kind(&self) -> GameplayEventKind {
        match self {
            GameplayEvent::Movement(_) => GameplayEventKind::Movement,
            GameplayEvent::Jump => GameplayEventKind::Jump,
            GameplayEvent::SprintStart => GameplayEventKind::SprintStart,
            GameplayEvent::SprintEnd => GameplayEventKind::SprintEnd,
            GameplayEvent::Look(_) => GameplayEventKind::Look,
            GameplayEvent::Interact => GameplayEventKind::Interact,
            GameplayEvent::Pause => GameplayEventKind::Pause,
            GameplayEvent::Resume => GameplayEventKind::Resume,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&GameplayEvent) + Send>;

struct Registration {
    id: ListenerId,
    /// `None` listens to every kind.
    kind: Option<GameplayEventKind>,
    listener: Listener,
}

#[derive(Default)]
pub struct EventPublisher {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, kind: Option<GameplayEventKind>, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration { id, kind, listener });
        id
    }

    pub fn subscribe(
        &mut self,
        kind: GameplayEventKind,
        listener: impl FnMut(&GameplayEvent) + Send + 'static,
    ) -> ListenerId {
        self.register(Some(kind), Box::new(listener))
    }

    pub fn subscribe_all(
        &mut self,
        listener: impl FnMut(&GameplayEvent) + Send + 'static,
    ) -> ListenerId {
        self.register(None, Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    pub fn listener_count(&self, kind: GameplayEventKind) -> usize {
        self.registrations
            .iter()
            .filter(|r| r.kind.is_none_or(|k| k == kind))
            .count()
    }

    /// Returns how many listeners heard the event. Zero is not an error.
    pub fn publish(&mut self, event: GameplayEvent) -> usize {
        let kind = event.kind();
        let mut heard = 0;

        for registration in &mut self.registrations {
            if registration.kind.is_none_or(|k| k == kind) {
                (registration.listener)(&event);
                heard += 1;
            }
        }

        log::trace!("published {event:?} to {heard} listeners");
        heard
    }
}

/// Shared FIFO of published events.
#[derive(Clone, Default)]
pub struct EventQueue {
    events: Arc<Mutex<VecDeque<GameplayEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that appends to this queue.
    pub fn listener(&self) -> impl FnMut(&GameplayEvent) + Send + 'static {
        let events = self.events.clone();
        move |event| {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(*event);
        }
    }

    pub fn drain(&self) -> Vec<GameplayEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
