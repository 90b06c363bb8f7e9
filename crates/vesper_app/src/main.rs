use std::process::ExitCode;

use flecs_ecs::prelude::*;
use vesper_core::App;
use vesper_gameplay::{GameplayEvent, GameplayInput, GameplayPlugin};
use vesper_input::{InputConfig, InputPlugin};
use vesper_window::run_vesper_app;

fn load_config() -> Option<InputConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Some(InputConfig::default());
    };

    match InputConfig::from_path(&path) {
        Ok(config) => {
            log::info!("loaded input config from {path}");
            Some(config)
        }
        Err(err) => {
            log::error!("{err}");
            None
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(config) = load_config() else {
        return ExitCode::FAILURE;
    };

    let mut app = App::new();
    app.add_plugin(InputPlugin);
    app.add_plugin(GameplayPlugin::new(config));

    if !app.is_running() {
        return ExitCode::FAILURE;
    }

    app.world
        .system_named::<&mut GameplayInput>("log_gameplay_events")
        .kind(flecs::pipeline::OnUpdate)
        .each(|gameplay| {
            for event in gameplay.drain_events() {
                match event {
                    // Per-frame noise
                    GameplayEvent::Movement(_) | GameplayEvent::Look(_) => log::debug!("{event:?}"),
                    _ => log::info!("{event:?}"),
                }
            }
        });

    if let Err(err) = run_vesper_app(app) {
        log::error!("event loop failed: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
