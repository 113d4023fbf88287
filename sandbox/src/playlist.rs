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

//! A simulated music theme that publishes playback events.

use std::sync::Mutex;
use std::time::Duration;

use reverb_core::{Event, EventBus, ThemeId};

/// One entry of a playlist.
#[derive(Debug, Clone)]
pub struct Track {
    pub audio_id: String,
    pub length: Duration,
}

impl Track {
    pub fn new(audio_id: impl Into<String>, length_secs: f32) -> Self {
        Self {
            audio_id: audio_id.into(),
            length: Duration::from_secs_f32(length_secs),
        }
    }
}

/// An ordered list of tracks played back to back.
#[derive(Debug)]
pub struct PlaylistTheme {
    pub name: String,
    pub tracks: Vec<Track>,
}

/// Advances playback of a [`PlaylistTheme`] and queues the matching events.
///
/// - `MusicChange` when a track starts,
/// - `MusicTransition` once per remaining second inside the fade window,
/// - `MusicEnd` when a track runs out.
pub struct PlaylistPlayer {
    // Boxed so the theme address, and therefore its ThemeId, stays put.
    theme: Box<PlaylistTheme>,
    theme_id: ThemeId,
    fade_window: Duration,
    current: usize,
    position: Duration,
    started: bool,
    last_announced: Option<u64>,
    finished_tracks: usize,
}

impl PlaylistPlayer {
    pub fn new(theme: PlaylistTheme, fade_window: Duration) -> Self {
        let theme = Box::new(theme);
        let theme_id = ThemeId::of(&*theme);
        Self {
            theme,
            theme_id,
            fade_window,
            current: 0,
            position: Duration::ZERO,
            started: false,
            last_announced: None,
            finished_tracks: 0,
        }
    }

    pub fn theme_id(&self) -> ThemeId {
        self.theme_id
    }

    pub fn theme_name(&self) -> &str {
        &self.theme.name
    }

    pub fn track_count(&self) -> usize {
        self.theme.tracks.len()
    }

    pub fn finished_tracks(&self) -> usize {
        self.finished_tracks
    }

    /// Moves playback forward by `delta` and queues whatever happened.
    pub fn advance(&mut self, bus: &mut EventBus, delta: Duration) {
        if self.theme.tracks.is_empty() {
            return;
        }
        if !self.started {
            self.started = true;
            bus.dispatch_queued(Event::music_change(self.theme_id, self.audio_id()));
        }

        self.position += delta;
        let length = self.theme.tracks[self.current].length;

        if self.position >= length {
            let overshoot = self.position - length;
            bus.dispatch_queued(Event::music_end(self.theme_id, self.audio_id()));
            self.finished_tracks += 1;
            self.current = (self.current + 1) % self.theme.tracks.len();
            self.position = overshoot;
            self.last_announced = None;
            bus.dispatch_queued(Event::music_change(self.theme_id, self.audio_id()));
            return;
        }

        let remaining = length - self.position;
        if remaining <= self.fade_window {
            let whole_seconds = remaining.as_secs();
            if self.last_announced != Some(whole_seconds) {
                self.last_announced = Some(whole_seconds);
                bus.dispatch_queued(Event::music_transition(
                    self.theme_id,
                    self.audio_id(),
                    remaining.as_secs_f32(),
                ));
            }
        }
    }

    fn audio_id(&self) -> String {
        self.theme.tracks[self.current].audio_id.clone()
    }
}

/// Consumer-side state updated from `MusicChange` events.
#[derive(Debug, Default)]
pub struct NowPlaying {
    pub audio_id: Mutex<Option<String>>,
}
