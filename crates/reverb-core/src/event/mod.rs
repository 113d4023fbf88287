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

//! Provides the typed event vocabulary and the bus that dispatches it.
//!
//! The primary component is the [`EventBus`], which owns a registry of
//! subscribers and a FIFO of pending events. Producers either dispatch an
//! [`Event`] immediately, in which case every matching subscriber runs before
//! the call returns, or queue it for the next [`EventBus::update`].
//!
//! ```text
//!  producer ──dispatch_immediate──► EventBus ──► subscribers (in-call)
//!  producer ──dispatch_queued─────► [queue] ──update()──► subscribers
//!  other thread ──QueuedSender────► [inbox] ──update()──┘
//! ```

mod bus;
mod subscriber;
mod types;

pub use self::bus::{EventBus, QueuedSender};
pub use self::subscriber::{EventCallback, SubscriberHandle};
pub use self::types::{Event, EventKind, MusicChange, MusicEnd, MusicTransition};
