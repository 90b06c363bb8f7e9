//! Turns Player/UI action callbacks into [`GameplayEvent`]s and drives the
//! pause toggle.

use glam::Vec2;
use vesper_input::{
    ActionCatalog, ActionHandler, ActionId, CallbackContext, InputError, ModeId, ModeRequests,
    Phase, PhaseMask,
};

use crate::events::{EventPublisher, GameplayEvent, GameplayEventKind};

pub const PLAYER_MODE: &str = "Player";
pub const UI_MODE: &str = "UI";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ControlState {
    #[default]
    Gameplay,
    Paused,
}

/// One row of the Player action table.
#[derive(Clone, Copy, Debug)]
struct Route {
    action: ActionId,
    phases: PhaseMask,
    emits: GameplayEventKind,
}

impl Route {
    fn new(action: ActionId, phases: PhaseMask, emits: GameplayEventKind) -> Self {
        Self {
            action,
            phases,
            emits,
        }
    }

    fn event(&self, ctx: &CallbackContext<'_>) -> Option<GameplayEvent> {
        // Vector actions report zero once released, whatever the source sent.
        let vector = if ctx.phase == Phase::Canceled {
            Vec2::ZERO
        } else {
            ctx.read_vec2()
        };

        let event = match self.emits {
            GameplayEventKind::Movement => GameplayEvent::Movement(vector),
            GameplayEventKind::Look => GameplayEvent::Look(vector),
            GameplayEventKind::Jump => GameplayEvent::Jump,
            GameplayEventKind::SprintStart => GameplayEvent::SprintStart,
            GameplayEventKind::SprintEnd => GameplayEvent::SprintEnd,
            GameplayEventKind::Interact => GameplayEvent::Interact,
            GameplayEventKind::Pause | GameplayEventKind::Resume => return None,
        };
        Some(event)
    }
}

pub struct GameplayAdapter {
    player: ModeId,
    ui: ModeId,
    pause: ActionId,
    resume: ActionId,
    routes: Vec<Route>,
    state: ControlState,
    publisher: EventPublisher,
}

impl GameplayAdapter {
    /// Resolves every action the adapter listens to. A missing mode or action
    /// is an error; nothing is registered in that case.
    pub fn new(catalog: &ActionCatalog) -> Result<Self, InputError> {
        let player = catalog.find_mode(PLAYER_MODE)?.id;
        let ui = catalog.find_mode(UI_MODE)?.id;
        let action = |name: &str| catalog.find_action(PLAYER_MODE, name);

        let routes = vec![
            Route::new(action("Movement")?, PhaseMask::all(), GameplayEventKind::Movement),
            Route::new(action("Jump")?, PhaseMask::PERFORMED, GameplayEventKind::Jump),
            Route::new(action("Sprint")?, PhaseMask::PERFORMED, GameplayEventKind::SprintStart),
            Route::new(action("Sprint")?, PhaseMask::CANCELED, GameplayEventKind::SprintEnd),
            Route::new(action("Look")?, PhaseMask::all(), GameplayEventKind::Look),
            Route::new(action("Interact")?, PhaseMask::PERFORMED, GameplayEventKind::Interact),
        ];

        Ok(Self {
            player,
            ui,
            pause: action("Pause")?,
            resume: catalog.find_action(UI_MODE, "Resume")?,
            routes,
            state: ControlState::Gameplay,
            publisher: EventPublisher::new(),
        })
    }

    pub fn player(&self) -> ModeId {
        self.player
    }

    pub fn ui(&self) -> ModeId {
        self.ui
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut EventPublisher {
        &mut self.publisher
    }

    /// Puts the adapter back in its initial state without touching modes.
    pub(crate) fn reset(&mut self) {
        self.state = ControlState::Gameplay;
    }

    fn pause(&mut self, requests: &mut ModeRequests) {
        log::info!("pausing gameplay");
        self.publisher.publish(GameplayEvent::Pause);
        requests.enable(self.ui);
        requests.disable(self.player);
        self.state = ControlState::Paused;
    }

    fn resume(&mut self, requests: &mut ModeRequests) {
        log::info!("resuming gameplay");
        self.publisher.publish(GameplayEvent::Resume);
        requests.enable(self.player);
        requests.disable(self.ui);
        self.state = ControlState::Gameplay;
    }

    fn route(&mut self, ctx: &CallbackContext<'_>) {
        let events: Vec<_> = self
            .routes
            .iter()
            .filter(|r| r.action == ctx.action.id && r.phases.contains(ctx.phase.mask()))
            .filter_map(|r| r.event(ctx))
            .collect();

        for event in events {
            self.publisher.publish(event);
        }
    }
}

impl ActionHandler for GameplayAdapter {
    fn on_started(&mut self, ctx: &CallbackContext<'_>, requests: &mut ModeRequests) {
        if ctx.action.id == self.pause {
            self.pause(requests);
        } else if ctx.action.id == self.resume {
            self.resume(requests);
        } else {
            self.route(ctx);
        }
    }

    fn on_performed(&mut self, ctx: &CallbackContext<'_>, _requests: &mut ModeRequests) {
        self.route(ctx);
    }

    fn on_canceled(&mut self, ctx: &CallbackContext<'_>, _requests: &mut ModeRequests) {
        self.route(ctx);
    }
}
