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

pub mod accounting;
pub mod api;
pub mod block_event;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod logging;
pub mod notify;
pub mod payout;
pub mod reward;
pub mod store;
pub mod sync;
#[cfg(test)]
pub mod test_utils;
pub mod utils;
