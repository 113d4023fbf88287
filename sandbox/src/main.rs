// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Reverb Sandbox
// Drives a simulated playlist through the runtime and logs every event.

mod playlist;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use reverb_core::{Event, EventBus, EventKind};
use reverb_runtime::{logging, Application, Runtime, RuntimeConfig, TickInfo};

use crate::playlist::{NowPlaying, PlaylistPlayer, PlaylistTheme, Track};

const FADE_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(version, about = "Plays a simulated playlist through the reverb event bus")]
struct Cli {
    /// Path to a JSON runtime configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks, overriding the configuration.
    #[arg(long)]
    ticks: Option<u64>,
}

struct SandboxApp {
    player: PlaylistPlayer,
    now_playing: Arc<NowPlaying>,
}

impl SandboxApp {
    fn new() -> Self {
        let theme = PlaylistTheme {
            name: "tavern".to_string(),
            tracks: vec![
                Track::new("tavern_intro", 3.0),
                Track::new("tavern_loop", 4.0),
                Track::new("tavern_outro", 2.5),
            ],
        };
        Self {
            player: PlaylistPlayer::new(theme, FADE_WINDOW),
            now_playing: Arc::new(NowPlaying::default()),
        }
    }
}

fn on_music_change(event: &Event, now_playing: &NowPlaying, _bus: &mut EventBus) {
    if let Ok(mut current) = now_playing.audio_id.lock() {
        *current = Some(event.audio_id().to_string());
    }
}

impl Application for SandboxApp {
    fn setup(&mut self, bus: &mut EventBus) -> Result<()> {
        log::info!(
            "Playing theme '{}' ({}).",
            self.player.theme_name(),
            self.player.theme_id()
        );

        bus.subscribe(EventKind::MusicChange, |event, _bus| {
            log::info!("Now playing '{}'.", event.audio_id());
        });
        bus.subscribe(EventKind::MusicTransition, |event, _bus| {
            if let Event::MusicTransition(payload) = event {
                log::info!(
                    "'{}' fading out, {:.2}s left.",
                    payload.audio_id,
                    payload.time_left
                );
            }
        });
        bus.subscribe(EventKind::MusicEnd, |event, _bus| {
            log::info!("'{}' ended.", event.audio_id());
        });
        bus.subscribe_with(
            EventKind::MusicChange,
            Arc::clone(&self.now_playing),
            on_music_change,
        );
        Ok(())
    }

    fn update(&mut self, bus: &mut EventBus, tick: TickInfo) {
        self.player.advance(bus, tick.delta);
    }

    fn should_exit(&self) -> bool {
        // One full pass over the playlist.
        self.player.finished_tracks() >= self.player.track_count()
    }

    fn shutdown(&mut self, _bus: &mut EventBus) {
        let current = self
            .now_playing
            .audio_id
            .lock()
            .ok()
            .and_then(|current| current.clone());
        log::info!(
            "Stopped while '{}' was current.",
            current.as_deref().unwrap_or("nothing")
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(ticks) = cli.ticks {
        config.max_ticks = Some(ticks);
    }

    logging::init(&config.log_filter);
    log::info!("Starting sandbox with {config:?}");

    let mut runtime = Runtime::new(config);
    let mut app = SandboxApp::new();
    let ticks = runtime.run(&mut app)?;

    log::info!("Sandbox finished after {ticks} tick(s).");
    Ok(())
}
