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

//! # Reverb Runtime
//!
//! The owner of the event bus. It builds the single [`EventBus`] instance,
//! drives an [`Application`] once per tick and drains the bus after each
//! application update.

#![warn(missing_docs)]

pub mod config;
pub mod logging;
mod runtime;

pub use config::{ConfigError, RuntimeConfig};
pub use reverb_core::EventBus;
pub use runtime::{Application, Runtime, TickInfo, TickReport};
