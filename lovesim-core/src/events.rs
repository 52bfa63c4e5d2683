//! Typed notifications emitted by the engine.
//!
//! Observers subscribe through an [`EventBus`] owned by the engine. Each
//! observer sees every event in emission order.

use crate::engine::EndReason;
use crate::result::GameResult;
use crate::state::{ChoiceRecord, Favorability};
use lovesim_api::SceneId;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    GameStarted {
        session_id: Uuid,
        scenario_id: String,
        resumed: bool,
    },
    SceneLoaded {
        scene_id: SceneId,
        terminal: bool,
    },
    SceneLoadFailed {
        scene_id: SceneId,
        message: String,
    },
    ChoiceMade {
        record: ChoiceRecord,
        /// Choices made so far in this session, including this one.
        choices_made: usize,
    },
    FavorabilityChanged {
        old: Favorability,
        new: Favorability,
        delta: i32,
    },
    PauseChanged {
        paused: bool,
    },
    SessionEnded {
        result: GameResult,
        reason: EndReason,
    },
    RankingSubmitted {
        nickname: String,
        rank: u32,
    },
}

/// Receives engine events.
pub trait SessionObserver: Send {
    fn on_event(&mut self, event: &GameEvent);
}

/// Shared observers, so the caller keeps a handle to read them back.
impl<T: SessionObserver> SessionObserver for Arc<Mutex<T>> {
    fn on_event(&mut self, event: &GameEvent) {
        if let Ok(mut inner) = self.lock() {
            inner.on_event(event);
        }
    }
}

/// Forwards events to a channel. A closed receiver is ignored.
impl SessionObserver for UnboundedSender<GameEvent> {
    fn on_event(&mut self, event: &GameEvent) {
        let _ = self.send(event.clone());
    }
}

/// Records every event; handy in tests.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<GameEvent>,
}

impl SessionObserver for EventLog {
    fn on_event(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Default)]
pub struct EventBus {
    observers: Vec<Box<dyn SessionObserver>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn emit(&mut self, event: GameEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
