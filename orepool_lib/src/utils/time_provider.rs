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

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Trait to get current system time, allowing for mocking in tests
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> SystemTime;
    fn set_since_epoch(&self, seconds: u64);
    fn seconds_since_epoch(&self) -> u64;
}

/// Default implementation that uses actual system time
#[derive(Clone, Debug)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn set_since_epoch(&self, _seconds: u64) {
        // No-op for production provider
    }

    fn seconds_since_epoch(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Mock time provider for testing
#[derive(Clone, Debug)]
pub struct TestTimeProvider {
    time: Arc<Mutex<SystemTime>>,
}

impl TestTimeProvider {
    pub fn new(time: SystemTime) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }
}

impl TimeProvider for TestTimeProvider {
    fn now(&self) -> SystemTime {
        *self.time.lock().unwrap()
    }

    fn set_since_epoch(&self, seconds: u64) {
        let mut time = self.time.lock().unwrap();
        *time = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(seconds);
    }

    fn seconds_since_epoch(&self) -> u64 {
        let time = self.time.lock().unwrap();
        time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

/// Formats a Unix timestamp into a human-readable string
pub fn format_timestamp(timestamp: u64) -> String {
    chrono::DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Invalid timestamp".to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_mock_time_provider() {
        let fixed_time = UNIX_EPOCH + Duration::from_secs(1000);
        let time_provider = TestTimeProvider::new(fixed_time);
        assert_eq!(time_provider.now(), fixed_time);
        assert_eq!(time_provider.seconds_since_epoch(), 1000);

        time_provider.set_since_epoch(2000);
        assert_eq!(time_provider.seconds_since_epoch(), 2000);
    }

    #[test]
    fn test_system_time_provider() {
        let provider = SystemTimeProvider;

        let provider_time = provider.now();
        let system_time = SystemTime::now();

        // Times should be very close (within 1 second)
        let diff = system_time.duration_since(provider_time).unwrap();
        assert!(diff < Duration::from_secs(1));

        // Should be greater than Jan 1, 2024 (timestamp 1704067200)
        assert!(provider.seconds_since_epoch() > 1704067200);
    }

    #[test]
    fn test_format_timestamp_valid() {
        let timestamp = 1704067200;
        let formatted = format_timestamp(timestamp);
        assert_eq!(formatted, "2024-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_format_timestamp_epoch() {
        let formatted = format_timestamp(0);
        assert_eq!(formatted, "1970-01-01 00:00:00 UTC");
    }
}
