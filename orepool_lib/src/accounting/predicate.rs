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

//! Proof-of-work qualification for submitted shares.
//!
//! A hash qualifies at a difficulty when, read as a 256-bit big-endian
//! integer, it is at or below the target for that difficulty. The same
//! predicate decides both share acceptance (pool difficulty) and block
//! candidacy (network difficulty), so the two decisions can never disagree
//! on the same hash.

/// Decides whether a proof hash meets a difficulty
pub trait ProofPredicate: Send + Sync {
    fn meets_difficulty(&self, hash: &str, difficulty: u64) -> bool;
}

/// Target-compare predicate: target = floor((2^256 - 1) / difficulty)
#[derive(Debug, Clone, Default)]
pub struct TargetPredicate;

impl TargetPredicate {
    /// Compute the 256-bit target for a difficulty by byte-wise short
    /// division of the all-ones value. A u128 accumulator is wide enough
    /// for any u64 divisor.
    fn target_for_difficulty(difficulty: u64) -> Option<[u8; 32]> {
        if difficulty == 0 {
            return None;
        }
        let divisor = difficulty as u128;
        let mut target = [0u8; 32];
        let mut remainder = 0u128;
        for byte in target.iter_mut() {
            let acc = (remainder << 8) | 0xff;
            *byte = (acc / divisor) as u8;
            remainder = acc % divisor;
        }
        Some(target)
    }

    fn parse_hash(hash: &str) -> Option<[u8; 32]> {
        let bytes = hex::decode(hash).ok()?;
        let bytes: [u8; 32] = bytes.try_into().ok()?;
        Some(bytes)
    }
}

impl ProofPredicate for TargetPredicate {
    /// Malformed hashes and a zero difficulty never qualify
    fn meets_difficulty(&self, hash: &str, difficulty: u64) -> bool {
        let Some(hash) = Self::parse_hash(hash) else {
            return false;
        };
        let Some(target) = Self::target_for_difficulty(difficulty) else {
            return false;
        };
        hash <= target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_one_accepts_anything() {
        let predicate = TargetPredicate;
        // Difficulty 1 target is all ones, so every 32-byte hash qualifies
        assert!(predicate.meets_difficulty(&"ff".repeat(32), 1));
        assert!(predicate.meets_difficulty(&"00".repeat(32), 1));
    }

    #[test]
    fn test_difficulty_two_halves_the_space() {
        let predicate = TargetPredicate;
        // Target for difficulty 2 is 0x7fff...ff
        let at_target = format!("7f{}", "ff".repeat(31));
        let above_target = format!("80{}", "00".repeat(31));
        assert!(predicate.meets_difficulty(&at_target, 2));
        assert!(!predicate.meets_difficulty(&above_target, 2));
    }

    #[test]
    fn test_higher_difficulty_is_stricter() {
        let predicate = TargetPredicate;
        let hash = format!("00ff{}", "00".repeat(30));
        assert!(predicate.meets_difficulty(&hash, 100));
        assert!(!predicate.meets_difficulty(&hash, u64::MAX));
    }

    #[test]
    fn test_zero_difficulty_never_qualifies() {
        let predicate = TargetPredicate;
        assert!(!predicate.meets_difficulty(&"00".repeat(32), 0));
    }

    #[test]
    fn test_malformed_hashes_never_qualify() {
        let predicate = TargetPredicate;
        assert!(!predicate.meets_difficulty("", 1));
        assert!(!predicate.meets_difficulty("zz", 1));
        // Wrong length
        assert!(!predicate.meets_difficulty("abcd", 1));
        assert!(!predicate.meets_difficulty(&"00".repeat(33), 1));
    }

    #[test]
    fn test_same_predicate_for_share_and_block() {
        let predicate = TargetPredicate;
        let hash = format!("0000000000ff{}", "ff".repeat(26));
        let pool_difficulty = 5000u64;
        let network_difficulty = 1u64 << 48;
        assert!(predicate.meets_difficulty(&hash, pool_difficulty));
        assert!(!predicate.meets_difficulty(&hash, network_difficulty));
    }
}
