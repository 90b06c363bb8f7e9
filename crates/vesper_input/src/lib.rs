use flecs_ecs::prelude::*;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};
use vesper_core::{App, Plugin};

pub mod catalog;
pub mod config;
pub mod error;
pub mod logical;
pub mod physical;
pub mod router;

pub use catalog::{ActionCatalog, ActionDef, ModeDef};
pub use config::InputConfig;
pub use error::InputError;
pub use logical::{
    ActionEvent, ActionId, ActionValue, CallbackContext, ModeId, Phase, PhaseMask, ValueKind,
};
pub use physical::{BindingResolver, ControlPath, PhysicalInput};
pub use router::{
    ActionHandler, Delivery, DisablePolicy, LeakWarning, ModeRequests, ModeRouter, SharedHandler,
};

/// Cloneable producer side of the input queue. Safe to use from any thread;
/// everything sent is drained on the main update.
#[derive(Clone, Debug)]
pub struct InputSender(UnboundedSender<PhysicalInput>);

impl InputSender {
    /// Returns false once the receiving side is gone.
    pub fn send(&self, input: PhysicalInput) -> bool {
        if self.0.send(input).is_err() {
            log::debug!("input queue closed, dropping {input:?}");
            return false;
        }
        true
    }
}

/// Singleton bridge between the window thread and the per-frame systems.
#[derive(Component)]
pub struct InputChannel {
    sender: UnboundedSender<PhysicalInput>,
    receiver: UnboundedReceiver<PhysicalInput>,
}

impl Default for InputChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl InputChannel {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded_channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> InputSender {
        InputSender(self.sender.clone())
    }

    /// Everything queued since the last drain, in arrival order.
    pub fn drain(&mut self) -> Vec<PhysicalInput> {
        let mut inputs = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(input) => inputs.push(input),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        inputs
    }
}

/// A producer for the world's [`InputChannel`]. [`InputPlugin`] must have
/// been added.
pub fn input_sender(world: &World) -> InputSender {
    world.get::<&InputChannel>(|channel| channel.sender())
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.register_singleton_default::<InputChannel>();
    }
}
