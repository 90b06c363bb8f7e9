pub use flecs_ecs;

use flecs_ecs::prelude::*;

/// The Plugin Trait
/// Every module (Input, Gameplay, Window) must implement this.
pub trait Plugin {
    fn build(&self, app: &mut App);
}

/// The Engine Application
/// Holds the ECS World and orchestrates the loop.
pub struct App {
    pub world: World,
    running: bool,
    frame: u64,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            running: true,
            frame: 0,
        }
    }

    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        plugin.build(self);
        self
    }

    /// Explicit ticks: there is no run() that takes over the thread.
    /// The windowing layer decides WHEN a frame runs; this processes ONE.
    pub fn update(&mut self) -> bool {
        if !self.running {
            return false;
        }

        self.frame += 1;
        if !self.world.progress() {
            log::info!("world requested quit at frame {}", self.frame);
            self.running = false;
        }

        self.running
    }

    /// Registers `T` as a singleton component and stores `value` as its only
    /// instance.
    pub fn register_singleton<T>(&mut self, value: T) -> &mut Self
    where
        T: ComponentId + DataComponent + ComponentType<Struct>,
    {
        self.world.component::<T>().add_trait::<flecs::Singleton>();
        self.world.set(value);
        self
    }

    pub fn register_singleton_default<T>(&mut self) -> &mut Self
    where
        T: ComponentId + DataComponent + ComponentType<Struct> + Default,
    {
        self.register_singleton(T::default())
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
