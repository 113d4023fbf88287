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

//! Defines the opaque identity of a music theme.

use std::fmt;

/// An opaque identifier for the music theme that produced an event.
///
/// The bus only stores and compares this value. It never dereferences it and
/// does not track whether the theme is still alive; keeping the identity
/// meaningful is the producer's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThemeId(usize);

impl ThemeId {
    /// Creates an identity from a raw value chosen by the producer.
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Derives an identity from the address of a live theme object.
    ///
    /// Two calls on the same object yield equal ids for as long as the object
    /// is not moved.
    pub fn of<T: ?Sized>(theme: &T) -> Self {
        Self(theme as *const T as *const () as usize)
    }

    /// Returns the raw identity value.
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "theme#{:x}", self.0)
    }
}
