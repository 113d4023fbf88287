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

//! Music events transported by the bus.
//!
//! These types are pure data with no dependency on the audio backend, so
//! both producers and consumers can be tested without one.

use std::fmt;

use crate::audio::ThemeId;

/// The closed set of event shapes the bus can carry.
///
/// Each kind corresponds to exactly one [`Event`] variant. Subscribers
/// register against a kind and only ever see events of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A track finished playing.
    MusicEnd,
    /// A track is fading out towards the next one.
    MusicTransition,
    /// A new track became the current one.
    MusicChange,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 3] = [
        EventKind::MusicEnd,
        EventKind::MusicTransition,
        EventKind::MusicChange,
    ];

    /// Returns a stable, lowercase name suitable for logs.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::MusicEnd => "music_end",
            EventKind::MusicTransition => "music_transition",
            EventKind::MusicChange => "music_change",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of [`Event::MusicEnd`].
#[derive(Debug, Clone, PartialEq)]
pub struct MusicEnd {
    /// The theme the track belongs to.
    pub theme: ThemeId,
    /// The playback instance that ended.
    pub audio_id: String,
}

/// Payload of [`Event::MusicTransition`].
#[derive(Debug, Clone, PartialEq)]
pub struct MusicTransition {
    /// The theme the track belongs to.
    pub theme: ThemeId,
    /// The playback instance that is fading out.
    pub audio_id: String,
    /// Seconds remaining until the track ends.
    pub time_left: f32,
}

/// Payload of [`Event::MusicChange`].
#[derive(Debug, Clone, PartialEq)]
pub struct MusicChange {
    /// The theme the new track belongs to.
    pub theme: ThemeId,
    /// The playback instance that just started.
    pub audio_id: String,
}

/// A discrete music occurrence, tagged by its variant.
///
/// The [`EventKind`] of an event is derived from its variant, so the tag and
/// the payload can never disagree. Prefer the factory functions
/// ([`Event::music_end`] and friends) over building variants by hand.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// See [`MusicEnd`].
    MusicEnd(MusicEnd),
    /// See [`MusicTransition`].
    MusicTransition(MusicTransition),
    /// See [`MusicChange`].
    MusicChange(MusicChange),
}

impl Event {
    /// Creates a [`EventKind::MusicEnd`] event.
    pub fn music_end(theme: ThemeId, audio_id: impl Into<String>) -> Self {
        Event::MusicEnd(MusicEnd {
            theme,
            audio_id: audio_id.into(),
        })
    }

    /// Creates a [`EventKind::MusicTransition`] event.
    pub fn music_transition(theme: ThemeId, audio_id: impl Into<String>, time_left: f32) -> Self {
        Event::MusicTransition(MusicTransition {
            theme,
            audio_id: audio_id.into(),
            time_left,
        })
    }

    /// Creates a [`EventKind::MusicChange`] event.
    pub fn music_change(theme: ThemeId, audio_id: impl Into<String>) -> Self {
        Event::MusicChange(MusicChange {
            theme,
            audio_id: audio_id.into(),
        })
    }

    /// Returns the kind tag matching this event's payload.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MusicEnd(_) => EventKind::MusicEnd,
            Event::MusicTransition(_) => EventKind::MusicTransition,
            Event::MusicChange(_) => EventKind::MusicChange,
        }
    }

    /// Returns the identity of the theme that produced this event.
    pub fn theme(&self) -> ThemeId {
        match self {
            Event::MusicEnd(e) => e.theme,
            Event::MusicTransition(e) => e.theme,
            Event::MusicChange(e) => e.theme,
        }
    }

    /// Returns the playback instance this event refers to.
    pub fn audio_id(&self) -> &str {
        match self {
            Event::MusicEnd(e) => &e.audio_id,
            Event::MusicTransition(e) => &e.audio_id,
            Event::MusicChange(e) => &e.audio_id,
        }
    }
}
