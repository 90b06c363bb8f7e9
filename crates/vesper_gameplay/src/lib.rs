use flecs_ecs::prelude::*;
use vesper_core::{App, Plugin};
use vesper_input::{InputChannel, InputConfig};

pub mod adapter;
pub mod error;
pub mod events;
pub mod session;

pub use adapter::{ControlState, GameplayAdapter, PLAYER_MODE, UI_MODE};
pub use error::GameplayError;
pub use events::{EventPublisher, EventQueue, GameplayEvent, GameplayEventKind, ListenerId};
pub use session::InputSession;

/// Singleton holding the running session and a queue of everything it
/// published since the last drain.
#[derive(Component)]
pub struct GameplayInput {
    session: InputSession,
    events: EventQueue,
}

impl GameplayInput {
    pub fn new(session: InputSession) -> Self {
        let events = EventQueue::new();
        session.subscribe_all(events.listener());
        Self { session, events }
    }

    pub fn session(&self) -> &InputSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut InputSession {
        &mut self.session
    }

    pub fn drain_events(&mut self) -> Vec<GameplayEvent> {
        self.events.drain()
    }
}

/// Starts an [`InputSession`] and feeds it from the [`InputChannel`] once per
/// frame. Add after `InputPlugin`.
#[derive(Default)]
pub struct GameplayPlugin {
    pub config: InputConfig,
}

impl GameplayPlugin {
    pub fn new(config: InputConfig) -> Self {
        Self { config }
    }
}

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        let session = match InputSession::from_config(&self.config) {
            Ok(session) => session,
            Err(err) => {
                log::error!("failed to start gameplay input: {err}");
                app.quit();
                return;
            }
        };

        app.register_singleton(GameplayInput::new(session));

        app.world
            .system_named::<(&mut InputChannel, &mut GameplayInput)>("route_gameplay_input")
            .kind(flecs::pipeline::OnUpdate)
            .each(|(channel, gameplay)| {
                for input in channel.drain() {
                    gameplay.session.feed(&input);
                }
                gameplay.session.end_frame();
            });
    }
}
