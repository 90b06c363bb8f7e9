//! Mode enable state and gated callback delivery.
//!
//! The router owns one slot per catalog mode. A mode's subscribers only hear
//! about its actions while the mode is enabled. Subscribers cannot reach the
//! router while it is delivering to them; they queue [`ModeRequest`]s instead,
//! which the router applies in order once the callback returns.

use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::ActionCatalog,
    error::InputError,
    logical::{ActionEvent, ActionId, CallbackContext, ModeId, Phase},
};

/// Receives the three phases of every action in the modes it is registered on.
pub trait ActionHandler: Send {
    fn on_started(&mut self, _ctx: &CallbackContext<'_>, _requests: &mut ModeRequests) {}
    fn on_performed(&mut self, _ctx: &CallbackContext<'_>, _requests: &mut ModeRequests) {}
    fn on_canceled(&mut self, _ctx: &CallbackContext<'_>, _requests: &mut ModeRequests) {}
}

/// Registration handle. Identity is the allocation, not the value.
pub type SharedHandler = Arc<Mutex<dyn ActionHandler>>;

pub fn shared<H: ActionHandler + 'static>(handler: H) -> SharedHandler {
    Arc::new(Mutex::new(handler))
}

fn lock(handler: &SharedHandler) -> MutexGuard<'_, dyn ActionHandler + 'static> {
    handler.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModeRequest {
    Enable(ModeId),
    Disable(ModeId),
    Activate(ModeId),
}

#[derive(Debug, Default)]
pub struct ModeRequests {
    queue: Vec<ModeRequest>,
}

impl ModeRequests {
    pub fn enable(&mut self, mode: ModeId) {
        self.queue.push(ModeRequest::Enable(mode));
    }

    pub fn disable(&mut self, mode: ModeId) {
        self.queue.push(ModeRequest::Disable(mode));
    }

    pub fn activate(&mut self, mode: ModeId) {
        self.queue.push(ModeRequest::Activate(mode));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn as_slice(&self) -> &[ModeRequest] {
        &self.queue
    }
}

/// What happens to activations still running when their mode is disabled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisablePolicy {
    /// Deliver a `canceled` with the zero value before the mode goes quiet.
    #[default]
    CancelInFlight,
    /// Stop delivering without telling anyone.
    Truncate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delivery {
    /// The owning mode is disabled (or the action is unknown).
    Dropped,
    /// Delivered to this many subscribers.
    Delivered(usize),
}

/// A mode left enabled at teardown.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeakWarning {
    pub mode: String,
}

impl fmt::Display for LeakWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input mode '{}' is still enabled at teardown; \
             disable it first to release its callbacks",
            self.mode
        )
    }
}

struct ModeSlot {
    enabled: bool,
    group: Option<String>,
    subscribers: Vec<SharedHandler>,
}

pub struct ModeRouter {
    catalog: Arc<ActionCatalog>,
    slots: Vec<ModeSlot>,
    in_flight: Vec<bool>,
    policy: DisablePolicy,
}

impl ModeRouter {
    /// Every mode starts disabled.
    pub fn new(catalog: Arc<ActionCatalog>) -> Self {
        Self {
            slots: catalog
                .modes()
                .iter()
                .map(|_| ModeSlot {
                    enabled: false,
                    group: None,
                    subscribers: Vec::new(),
                })
                .collect(),
            in_flight: vec![false; catalog.actions().len()],
            catalog,
            policy: DisablePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DisablePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DisablePolicy {
        self.policy
    }

    pub fn catalog(&self) -> &Arc<ActionCatalog> {
        &self.catalog
    }

    pub fn mode_id(&self, name: &str) -> Result<ModeId, InputError> {
        self.catalog.find_mode(name).map(|m| m.id)
    }

    /// Puts `modes` in one exclusive group: [`ModeRouter::activate`] on any of
    /// them disables the rest.
    pub fn set_exclusive_group(&mut self, group: &str, modes: &[&str]) -> Result<(), InputError> {
        let ids = modes
            .iter()
            .map(|name| self.mode_id(name))
            .collect::<Result<Vec<_>, _>>()?;

        for id in ids {
            if let Some(slot) = self.slots.get_mut(id.0 as usize) {
                slot.group = Some(group.to_string());
            }
        }

        Ok(())
    }

    pub fn group_of(&self, mode: ModeId) -> Option<&str> {
        self.slots
            .get(mode.0 as usize)
            .and_then(|s| s.group.as_deref())
    }

    pub fn is_enabled(&self, mode: ModeId) -> bool {
        self.slots
            .get(mode.0 as usize)
            .is_some_and(|s| s.enabled)
    }

    pub fn enabled_modes(&self) -> Vec<ModeId> {
        self.catalog
            .modes()
            .iter()
            .map(|m| m.id)
            .filter(|id| self.is_enabled(*id))
            .collect()
    }

    /// True between an action's `started`/`performed` and its `canceled`.
    pub fn is_in_flight(&self, action: ActionId) -> bool {
        self.in_flight.get(action.0 as usize).copied().unwrap_or(false)
    }

    pub fn enable(&mut self, mode: ModeId) {
        self.apply(vec![ModeRequest::Enable(mode)]);
    }

    pub fn disable(&mut self, mode: ModeId) {
        self.apply(vec![ModeRequest::Disable(mode)]);
    }

    /// Enables `mode`, then disables every other member of its group.
    pub fn activate(&mut self, mode: ModeId) {
        self.apply(vec![ModeRequest::Activate(mode)]);
    }

    /// Registers `handler` on every action of `mode`. Returns false if it was
    /// already registered there.
    pub fn add_callbacks(&mut self, mode: ModeId, handler: &SharedHandler) -> bool {
        let Some(slot) = self.slots.get_mut(mode.0 as usize) else {
            return false;
        };
        if slot.subscribers.iter().any(|s| Arc::ptr_eq(s, handler)) {
            return false;
        }
        slot.subscribers.push(handler.clone());
        true
    }

    /// Returns false if `handler` was not registered on `mode`.
    pub fn remove_callbacks(&mut self, mode: ModeId, handler: &SharedHandler) -> bool {
        let Some(slot) = self.slots.get_mut(mode.0 as usize) else {
            return false;
        };
        let before = slot.subscribers.len();
        slot.subscribers.retain(|s| !Arc::ptr_eq(s, handler));
        slot.subscribers.len() != before
    }

    /// Replaces every subscriber of `mode`. `None` only clears.
    pub fn set_callbacks(&mut self, mode: ModeId, handler: Option<&SharedHandler>) {
        if let Some(slot) = self.slots.get_mut(mode.0 as usize) {
            slot.subscribers.clear();
        }
        if let Some(handler) = handler {
            self.add_callbacks(mode, handler);
        }
    }

    pub fn subscriber_count(&self, mode: ModeId) -> usize {
        self.slots
            .get(mode.0 as usize)
            .map_or(0, |s| s.subscribers.len())
    }

    pub fn dispatch(&mut self, event: ActionEvent) -> Delivery {
        let mut requests = ModeRequests::default();
        let delivery = self.deliver(&event, &mut requests);
        if !requests.is_empty() {
            log::debug!("applying mode requests {:?}", requests.as_slice());
        }
        self.apply(requests.queue);
        delivery
    }

    /// Modes that are still enabled; each one is a leak if the router is
    /// about to be dropped.
    pub fn leak_check(&self) -> Vec<LeakWarning> {
        self.catalog
            .modes()
            .iter()
            .filter(|m| self.is_enabled(m.id))
            .map(|m| LeakWarning {
                mode: m.name.clone(),
            })
            .collect()
    }

    fn deliver(&mut self, event: &ActionEvent, requests: &mut ModeRequests) -> Delivery {
        let catalog = self.catalog.clone();
        let Some(action) = catalog.action(event.action) else {
            log::warn!("ignoring input for unknown action {:?}", event.action);
            return Delivery::Dropped;
        };
        let Some(mode) = catalog.mode(action.mode) else {
            return Delivery::Dropped;
        };

        let Some(slot) = self.slots.get(action.mode.0 as usize) else {
            return Delivery::Dropped;
        };
        if !slot.enabled {
            log::debug!(
                "dropped {}/{} {:?}: mode disabled",
                mode.name,
                action.name,
                event.phase
            );
            return Delivery::Dropped;
        }

        let subscribers = slot.subscribers.clone();
        self.in_flight[event.action.0 as usize] = event.phase != Phase::Canceled;

        let ctx = CallbackContext {
            mode,
            action,
            phase: event.phase,
            value: event.value,
        };

        for subscriber in &subscribers {
            let mut handler = lock(subscriber);
            match event.phase {
                Phase::Started => handler.on_started(&ctx, requests),
                Phase::Performed => handler.on_performed(&ctx, requests),
                Phase::Canceled => handler.on_canceled(&ctx, requests),
            }
        }

        Delivery::Delivered(subscribers.len())
    }

    fn apply(&mut self, requests: Vec<ModeRequest>) {
        let mut queue: VecDeque<ModeRequest> = requests.into();

        while let Some(request) = queue.pop_front() {
            let mut follow_up = ModeRequests::default();

            match request {
                ModeRequest::Enable(mode) => self.switch_on(mode),
                ModeRequest::Disable(mode) => self.switch_off(mode, &mut follow_up),
                ModeRequest::Activate(mode) => {
                    self.switch_on(mode);
                    if let Some(group) = self.group_of(mode).map(str::to_string) {
                        let others: Vec<_> = self
                            .catalog
                            .modes()
                            .iter()
                            .map(|m| m.id)
                            .filter(|id| *id != mode && self.group_of(*id) == Some(group.as_str()))
                            .collect();
                        for other in others {
                            self.switch_off(other, &mut follow_up);
                        }
                    }
                }
            }

            queue.extend(follow_up.queue);
        }
    }

    fn switch_on(&mut self, mode: ModeId) {
        let Some(slot) = self.slots.get_mut(mode.0 as usize) else {
            log::warn!("cannot enable unknown mode {mode:?}");
            return;
        };
        if !slot.enabled {
            slot.enabled = true;
            if let Some(def) = self.catalog.mode(mode) {
                log::info!("input mode '{}' enabled", def.name);
            }
        }
    }

    fn switch_off(&mut self, mode: ModeId, follow_up: &mut ModeRequests) {
        if !self.is_enabled(mode) {
            return;
        }

        let catalog = self.catalog.clone();
        let running: Vec<_> = catalog
            .mode_actions(mode)
            .filter(|a| self.is_in_flight(a.id))
            .collect();

        for action in running {
            match self.policy {
                DisablePolicy::CancelInFlight => {
                    log::debug!("canceling in-flight '{}' on disable", action.name);
                    self.deliver(
                        &ActionEvent::canceled(action.id, action.kind.zero()),
                        follow_up,
                    );
                }
                DisablePolicy::Truncate => {
                    self.in_flight[action.id.0 as usize] = false;
                }
            }
        }

        if let Some(slot) = self.slots.get_mut(mode.0 as usize) {
            slot.enabled = false;
        }
        if let Some(def) = catalog.mode(mode) {
            log::info!("input mode '{}' disabled", def.name);
        }
    }
}

impl Drop for ModeRouter {
    fn drop(&mut self) {
        for warning in self.leak_check() {
            log::warn!("{warning}");
        }
    }
}
