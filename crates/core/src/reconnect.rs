//! Reconnect controller for transport-backed sources
//!
//! A pure state machine: callers feed it discrete link events and carry out
//! the commands it returns. It never touches a transport or a timer itself,
//! which keeps every transition testable with synthetic events.
//!
//! ```text
//!   Disconnected --Start / RetryElapsed--> Connecting --Opened--> Connected
//!        ^                                     |                     |
//!        +-------------OpenFailed--------------+                     |
//!        +------------TransportError / Closed (release)--------------+
//! ```
//!
//! Entering `Disconnected` schedules exactly one retry after a constant delay.
//! While a retry is pending, further loss signals are absorbed.

use crate::constants::DEFAULT_RECONNECT_DELAY;
use log::{debug, info, trace, warn};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Discrete inputs to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// First connection request at startup
    Start,
    /// The scheduled retry delay has passed
    RetryElapsed,
    /// Transport opened successfully
    Opened,
    /// Transport could not be opened
    OpenFailed(String),
    /// Transport reported an error while in use
    TransportError(String),
    /// Transport closed (end of stream)
    Closed,
}

/// Side effects the caller must perform, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCommand {
    /// Attempt to open the transport
    Open,
    /// Drop every live transport resource
    ReleaseResources,
    /// Deliver `RetryElapsed` after the given delay
    ScheduleRetry(Duration),
}

#[derive(Debug, Clone)]
pub struct ReconnectController {
    state: LinkState,
    delay: Duration,
    retry_pending: bool,
    failed_attempts: u32,
    last_error: Option<String>,
}

impl ReconnectController {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: LinkState::Disconnected,
            delay,
            retry_pending: false,
            failed_attempts: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// True while a retry is scheduled and has not yet elapsed
    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    /// Consecutive failed open attempts since the last successful open
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply an event and return the commands to carry out
    pub fn handle(&mut self, event: LinkEvent) -> Vec<LinkCommand> {
        let mut commands = Vec::new();

        match (self.state, event) {
            (LinkState::Disconnected, LinkEvent::Start) if !self.retry_pending => {
                self.state = LinkState::Connecting;
                commands.push(LinkCommand::Open);
            }
            (LinkState::Disconnected, LinkEvent::RetryElapsed) if self.retry_pending => {
                self.retry_pending = false;
                self.state = LinkState::Connecting;
                debug!("Retry delay elapsed, reconnecting");
                commands.push(LinkCommand::Open);
            }
            (LinkState::Connecting, LinkEvent::Opened) => {
                self.state = LinkState::Connected;
                self.failed_attempts = 0;
                self.last_error = None;
                info!("Link connected");
            }
            (LinkState::Connecting, LinkEvent::OpenFailed(reason))
            | (LinkState::Connecting, LinkEvent::TransportError(reason)) => {
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                warn!(
                    "Connection attempt {} failed: {}",
                    self.failed_attempts, reason
                );
                self.last_error = Some(reason);
                self.enter_disconnected(&mut commands);
            }
            (LinkState::Connecting, LinkEvent::Closed) => {
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                self.last_error = Some("closed while connecting".to_string());
                self.enter_disconnected(&mut commands);
            }
            (LinkState::Connected, LinkEvent::TransportError(reason)) => {
                warn!("Link lost: {}", reason);
                self.last_error = Some(reason);
                commands.push(LinkCommand::ReleaseResources);
                self.enter_disconnected(&mut commands);
            }
            (LinkState::Connected, LinkEvent::Closed) => {
                warn!("Link closed");
                self.last_error = Some("closed".to_string());
                commands.push(LinkCommand::ReleaseResources);
                self.enter_disconnected(&mut commands);
            }
            (
                LinkState::Disconnected,
                LinkEvent::TransportError(_) | LinkEvent::Closed | LinkEvent::OpenFailed(_),
            ) => {
                // Duplicate signal for a failure already handled
                self.enter_disconnected(&mut commands);
            }
            (state, event) => {
                trace!("Ignoring {:?} in state {:?}", event, state);
            }
        }

        commands
    }

    fn enter_disconnected(&mut self, commands: &mut Vec<LinkCommand>) {
        self.state = LinkState::Disconnected;
        if !self.retry_pending {
            self.retry_pending = true;
            warn!("Reconnecting in {:?}", self.delay);
            commands.push(LinkCommand::ScheduleRetry(self.delay));
        }
    }
}

impl Default for ReconnectController {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}
