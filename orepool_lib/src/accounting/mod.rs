// Copyright (C) 2025, 2026 Orepool Developers (see AUTHORS)
//
// This file is part of Orepool
//
// Orepool is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Orepool is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Orepool. If not, see <https://www.gnu.org/licenses/>.

//! Share accounting over a rolling time window.

pub mod predicate;
pub mod window;

/// One coin in atomic units
pub const COIN: u64 = 1_000_000_000_000;

/// A consistent cut of the share window: per-miner weights and their sum,
/// taken at a single instant so the proportions cannot drift between the
/// two reads.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    pub weights: Vec<(String, u64)>,
    pub total_weight: u64,
    /// Epoch seconds at which the snapshot was taken
    pub taken_at: u64,
}

impl WindowSnapshot {
    pub fn is_empty(&self) -> bool {
        self.total_weight == 0
    }
}
