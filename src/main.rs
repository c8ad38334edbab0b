//! Headless demo of persistent vehicle rotation.
//!
//! Usage: `persistent-rotation [config.json] [scenario.json]`. Without a
//! scenario the built-in one runs. Z-up, right handed.

// Recommended alias.
extern crate nalgebra as na;

use anyhow::Context;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use sim_rotation::RotationConfig;

mod demo;
mod plugin;
mod scenario;

use demo::{DemoWorld, FIXED_HZ};
use plugin::RotationPlugin;
use scenario::{Scenario, ScenarioPlugin};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) => RotationConfig::from_path(&path)
            .with_context(|| format!("loading rotation config {path}"))?,
        None => RotationConfig::default(),
    };
    let scenario = match args.next() {
        Some(path) => Scenario::from_path(path)?,
        None => Scenario::builtin(),
    };
    let save_path = scenario.save_path.clone();

    let exit = App::new()
        .add_plugins((MinimalPlugins, LogPlugin::default()))
        .insert_resource(Time::<Fixed>::from_hz(FIXED_HZ))
        .add_plugins(RotationPlugin::<DemoWorld>::new(config).with_save_path(save_path))
        .add_plugins(ScenarioPlugin { scenario })
        .run();

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => anyhow::bail!("app exited with code {code}"),
    }
}
