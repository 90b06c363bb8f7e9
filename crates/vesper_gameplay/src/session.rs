use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vesper_input::{
    ActionCatalog, ActionEvent, ActionValue, BindingResolver, Delivery, InputConfig, ModeId,
    ModeRouter, Phase, PhysicalInput, SharedHandler,
};

use crate::{
    adapter::{ControlState, GameplayAdapter},
    error::GameplayError,
    events::{GameplayEvent, GameplayEventKind, ListenerId},
};

/// A running gameplay input setup: router, resolver and the adapter
/// registered on the Player and UI modes.
///
/// Dropping a session that was never stopped stops it, so both modes are
/// disabled and the adapter is unregistered on every exit path.
pub struct InputSession {
    router: ModeRouter,
    resolver: BindingResolver,
    adapter: Arc<Mutex<GameplayAdapter>>,
    handler: SharedHandler,
    player: ModeId,
    ui: ModeId,
    running: bool,
}

impl InputSession {
    /// Loads the catalog named by `config` (or the bundled one) and starts.
    pub fn from_config(config: &InputConfig) -> Result<Self, GameplayError> {
        let catalog = Arc::new(config.load_catalog()?);
        Self::start(catalog, config)
    }

    pub fn start(catalog: Arc<ActionCatalog>, config: &InputConfig) -> Result<Self, GameplayError> {
        let adapter = GameplayAdapter::new(&catalog)?;
        let (player, ui) = (adapter.player(), adapter.ui());

        let mut router = config.build_router(catalog.clone())?;
        let resolver = config.build_resolver(catalog.clone());

        let adapter = Arc::new(Mutex::new(adapter));
        let handler: SharedHandler = adapter.clone();
        router.add_callbacks(player, &handler);
        router.add_callbacks(ui, &handler);

        router.enable(player);
        router.disable(ui);

        log::info!(
            "input session started with '{}' ({} modes, {} actions)",
            catalog.name(),
            catalog.modes().len(),
            catalog.actions().len()
        );

        Ok(Self {
            router,
            resolver,
            adapter,
            handler,
            player,
            ui,
            running: true,
        })
    }

    /// Disables both modes and unregisters the adapter. Calling it again does
    /// nothing.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        self.router.disable(self.player);
        self.router.disable(self.ui);
        self.router.remove_callbacks(self.player, &self.handler);
        self.router.remove_callbacks(self.ui, &self.handler);
        self.resolver.sync_modes(|_| false);
        self.adapter().reset();

        log::info!("input session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn adapter(&self) -> MutexGuard<'_, GameplayAdapter> {
        self.adapter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ControlState {
        self.adapter().state()
    }

    pub fn player(&self) -> ModeId {
        self.player
    }

    pub fn ui(&self) -> ModeId {
        self.ui
    }

    pub fn is_enabled(&self, mode: ModeId) -> bool {
        self.router.is_enabled(mode)
    }

    pub fn router(&self) -> &ModeRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut ModeRouter {
        &mut self.router
    }

    /// The handle the adapter is registered under.
    pub fn handler(&self) -> SharedHandler {
        self.handler.clone()
    }

    pub fn subscribe(
        &self,
        kind: GameplayEventKind,
        listener: impl FnMut(&GameplayEvent) + Send + 'static,
    ) -> ListenerId {
        self.adapter().publisher_mut().subscribe(kind, listener)
    }

    pub fn subscribe_all(
        &self,
        listener: impl FnMut(&GameplayEvent) + Send + 'static,
    ) -> ListenerId {
        self.adapter().publisher_mut().subscribe_all(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.adapter().publisher_mut().unsubscribe(id)
    }

    /// Routes one resolved action event.
    pub fn dispatch(&mut self, event: ActionEvent) -> Delivery {
        if !self.running {
            log::debug!("session stopped, dropping {event:?}");
            return Delivery::Dropped;
        }

        let delivery = self.router.dispatch(event);
        let router = &self.router;
        self.resolver.sync_modes(|m| router.is_enabled(m));
        delivery
    }

    /// Looks the action up by name and dispatches it.
    pub fn inject(
        &mut self,
        mode: &str,
        action: &str,
        phase: Phase,
        value: ActionValue,
    ) -> Result<Delivery, GameplayError> {
        if !self.running {
            return Err(GameplayError::Stopped);
        }
        let action = self.router.catalog().find_action(mode, action)?;
        Ok(self.dispatch(ActionEvent::new(action, phase, value)))
    }

    /// Resolves raw input against the current mode state and dispatches the
    /// result. Returns how many events reached at least the router's gate.
    pub fn feed(&mut self, input: &PhysicalInput) -> usize {
        if !self.running {
            return 0;
        }

        let router = &self.router;
        let events = self.resolver.resolve(input, |m| router.is_enabled(m));
        self.dispatch_all(events)
    }

    /// Closes the frame: delta-driven actions that saw no movement cancel.
    pub fn end_frame(&mut self) -> usize {
        if !self.running {
            return 0;
        }

        let router = &self.router;
        let events = self.resolver.end_frame(|m| router.is_enabled(m));
        self.dispatch_all(events)
    }

    fn dispatch_all(&mut self, events: Vec<ActionEvent>) -> usize {
        let mut delivered = 0;
        for event in events {
            if let Delivery::Delivered(_) = self.router.dispatch(event) {
                delivered += 1;
            }
        }

        let router = &self.router;
        self.resolver.sync_modes(|m| router.is_enabled(m));
        delivered
    }
}

impl Drop for InputSession {
    fn drop(&mut self) {
        self.stop();
    }
}
