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

#[cfg(unix)]
use tokio::signal::unix::{self, SignalKind};

use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info};

/// Why the pool is shutting down. The payout drain runs for every reason;
/// the exit code reports whether the stop was operator requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Still running
    None,
    /// Operator interrupt (ctrl-c)
    Interrupt,
    /// Service manager stop (SIGTERM or SIGHUP)
    Terminate,
    /// A component failed and the pool cannot continue
    Error,
}

impl ShutdownReason {
    /// True for stops an operator or service manager asked for
    pub fn is_requested(&self) -> bool {
        matches!(self, ShutdownReason::Interrupt | ShutdownReason::Terminate)
    }
}

/// Watch for termination signals and publish the shutdown reason.
///
/// The task also exits when some other component publishes a reason first,
/// so it never outlives the shutdown it reports.
#[cfg(unix)]
pub fn setup_signal_handler(exit_sender: watch::Sender<ShutdownReason>) -> JoinHandle<()> {
    let mut exit_receiver = exit_sender.subscribe();
    tokio::spawn(async move {
        let (mut hangup, mut terminate) = match (
            unix::signal(SignalKind::hangup()),
            unix::signal(SignalKind::terminate()),
        ) {
            (Ok(hangup), Ok(terminate)) => (hangup, terminate),
            (hangup, terminate) => {
                error!(
                    "Signal handler registration failed (hangup: {}, terminate: {})",
                    hangup.is_ok(),
                    terminate.is_ok()
                );
                let _ = exit_sender.send(ShutdownReason::Error);
                return;
            }
        };

        let reason = tokio::select! {
            _ = exit_receiver.changed() => return,
            _ = tokio::signal::ctrl_c() => ShutdownReason::Interrupt,
            _ = hangup.recv() => ShutdownReason::Terminate,
            _ = terminate.recv() => ShutdownReason::Terminate,
        };

        info!("Shutdown requested ({:?}), stopping", reason);
        let _ = exit_sender.send(reason);
    })
}

#[cfg(not(unix))]
pub fn setup_signal_handler(exit_sender: watch::Sender<ShutdownReason>) -> JoinHandle<()> {
    let mut exit_receiver = exit_sender.subscribe();
    tokio::spawn(async move {
        tokio::select! {
            _ = exit_receiver.changed() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested (ctrl-c), stopping");
                let _ = exit_sender.send(ShutdownReason::Interrupt);
            }
        }
    })
}
