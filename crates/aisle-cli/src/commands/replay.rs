//! Gesture replay command
//!
//! A gesture script is a TOML file of `[[events]]`, each tagged with
//! `event = "pointer_down" | "pointer_move" | ...`. An optional
//! `viewport = [w, h]` sets the pixel space the coordinates refer to.

use super::load_view;
use aisle_view::{InputEvent, Intent};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use tracing::info;

#[derive(Debug, Deserialize)]
struct GestureScript {
    #[serde(default)]
    viewport: Option<[f32; 2]>,
    #[serde(default)]
    events: Vec<InputEvent>,
}

pub struct ReplayArgs {
    pub snapshot: String,
    pub gestures: String,
    pub settings: Option<String>,
    pub lines: bool,
}

pub fn run(args: ReplayArgs) -> Result<()> {
    let content = fs::read_to_string(&args.gestures)
        .with_context(|| format!("Failed to read gesture script: {}", args.gestures))?;
    let script: GestureScript = toml::from_str(&content)
        .with_context(|| format!("Failed to parse gesture script: {}", args.gestures))?;

    let mut view = load_view(&args.snapshot, args.settings.as_deref(), None)?;
    if let Some([width, height]) = script.viewport {
        view.set_viewport(width, height);
    }

    let mut intents: Vec<Intent> = Vec::new();
    for event in &script.events {
        view.handle(event);
        intents.extend(view.drain_intents());
    }
    info!(events = script.events.len(), intents = intents.len(), "replay finished");
    view.teardown();

    if args.lines {
        for intent in &intents {
            println!("{}", serde_json::to_string(intent)?);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&intents)?);
    }
    Ok(())
}
