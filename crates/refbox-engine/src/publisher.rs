//! Broadcast-protocol sink: referee frames over UDP.
//!
//! Every publish is framed as a [`RefereeMessage`] and sent as one JSON
//! datagram to the configured (usually multicast) address. Teams poll
//! these frames; the `command_counter` only moves when a publish carries a
//! command, so a receiver can tell a fresh command from a heartbeat that
//! repeats the previous one.
//!
//! [`StateSink::publish`] runs inside the controller's critical section, so
//! the sink only encodes and enqueues. A background task owns the socket
//! and drains a bounded queue; when the queue is full the frame is dropped.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use refbox_core::publish::StateSink;
use refbox_types::{CommandKind, EventCommand, GameDuration, MatchState, Stage, Team, TeamInfo};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Frames waiting for the socket. A stalled network drops frames past this.
const FRAME_QUEUE_CAPACITY: usize = 64;

/// Errors that prevent the publisher from starting.
#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    /// The target address did not resolve.
    #[error("can not resolve publish address {address}: {reason}")]
    Resolve {
        /// The configured address.
        address: String,
        /// Why resolution failed.
        reason: String,
    },

    /// No local socket could be bound.
    #[error("can not bind UDP socket: {source}")]
    Bind {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

/// One frame of the referee protocol.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RefereeMessage {
    /// When this frame was built, in microseconds since the Unix epoch.
    pub packet_timestamp: i64,
    /// Current stage.
    pub stage: Stage,
    /// Remaining time in the stage (nanoseconds, may be negative).
    pub stage_time_left: GameDuration,
    /// The most recent command. Repeated on heartbeats.
    pub command: EventCommand,
    /// Number of commands issued so far.
    pub command_counter: u32,
    /// When `command` was issued, in microseconds since the Unix epoch.
    pub command_timestamp: i64,
    /// Yellow team.
    pub yellow: TeamInfo,
    /// Blue team.
    pub blue: TeamInfo,
}

/// Command bookkeeping carried from frame to frame.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    command: EventCommand,
    command_counter: u32,
    command_issued: DateTime<Utc>,
}

impl FrameBuilder {
    /// A builder whose last command is a halt issued at `now`.
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            command: EventCommand::neutral(CommandKind::Halt),
            command_counter: 0,
            command_issued: now,
        }
    }

    /// Build the next frame. A `Some` command replaces the current one and
    /// bumps the counter.
    pub fn next_frame(
        &mut self,
        state: &MatchState,
        command: Option<&EventCommand>,
        now: DateTime<Utc>,
    ) -> RefereeMessage {
        if let Some(command) = command {
            self.command = *command;
            self.command_counter = self.command_counter.wrapping_add(1);
            self.command_issued = now;
        }

        RefereeMessage {
            packet_timestamp: now.timestamp_micros(),
            stage: state.stage,
            stage_time_left: state.stage_time_left,
            command: self.command,
            command_counter: self.command_counter,
            command_timestamp: self.command_issued.timestamp_micros(),
            yellow: state.team(Team::Yellow).cloned().unwrap_or_default(),
            blue: state.team(Team::Blue).cloned().unwrap_or_default(),
        }
    }
}

/// UDP referee frame publisher.
#[derive(Debug)]
pub struct UdpPublisher {
    frames: Mutex<FrameBuilder>,
    tx: mpsc::Sender<Vec<u8>>,
    target: SocketAddr,
}

impl UdpPublisher {
    /// Resolve `address`, bind a local socket, and start the send task.
    pub async fn bind(address: &str) -> Result<(Self, JoinHandle<()>), PublisherError> {
        let target = tokio::net::lookup_host(address)
            .await
            .map_err(|e| PublisherError::Resolve {
                address: address.to_owned(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| PublisherError::Resolve {
                address: address.to_owned(),
                reason: String::from("no addresses"),
            })?;

        let local = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(local).await?;
        info!(%target, local = ?socket.local_addr().ok(), "Referee publisher bound");

        let (tx, rx) = mpsc::channel(FRAME_QUEUE_CAPACITY);
        let handle = tokio::spawn(send_frames(socket, target, rx));

        Ok((
            Self {
                frames: Mutex::new(FrameBuilder::new(Utc::now())),
                tx,
                target,
            },
            handle,
        ))
    }

    /// Where frames are sent.
    pub const fn target(&self) -> SocketAddr {
        self.target
    }

    fn frames(&self) -> MutexGuard<'_, FrameBuilder> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateSink for UdpPublisher {
    fn name(&self) -> &'static str {
        "udp-referee"
    }

    fn publish(&self, state: &MatchState, command: Option<&EventCommand>) {
        let frame = self.frames().next_frame(state, command, Utc::now());
        let bytes = match serde_json::to_vec(&frame) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "Could not encode referee message");
                return;
            }
        };

        match self.tx.try_send(bytes) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(counter = frame.command_counter, "Referee frame queue full, frame dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Referee send task stopped, frame dropped");
            }
        }
    }
}

/// Drain the frame queue onto the socket until every sender is gone.
async fn send_frames(socket: UdpSocket, target: SocketAddr, mut rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(bytes) = rx.recv().await {
        match socket.send_to(&bytes, target).await {
            Ok(sent) => debug!(sent, "Referee frame sent"),
            Err(e) => warn!(%target, error = %e, "Could not send referee frame"),
        }
    }
    debug!("Referee publisher stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 20, 14, 0, secs).single().unwrap()
    }

    #[test]
    fn counter_moves_only_with_commands() {
        let mut frames = FrameBuilder::new(at(0));
        let state = MatchState::default();

        let heartbeat = frames.next_frame(&state, None, at(1));
        assert_eq!(heartbeat.command_counter, 0);
        assert_eq!(heartbeat.command.command, CommandKind::Halt);

        let stop = EventCommand::neutral(CommandKind::Stop);
        let first = frames.next_frame(&state, Some(&stop), at(2));
        assert_eq!(first.command_counter, 1);
        assert_eq!(first.command, stop);
        assert_eq!(first.command_timestamp, at(2).timestamp_micros());

        let repeat = frames.next_frame(&state, None, at(3));
        assert_eq!(repeat.command_counter, 1);
        assert_eq!(repeat.command, stop);
        assert_eq!(repeat.command_timestamp, at(2).timestamp_micros());
        assert_eq!(repeat.packet_timestamp, at(3).timestamp_micros());
    }

    #[test]
    fn frame_carries_both_teams() {
        let mut frames = FrameBuilder::new(at(0));
        let mut state = MatchState::default();
        state.team_mut(Team::Blue).unwrap().goals = 2;
        state.team_mut(Team::Yellow).unwrap().name = String::from("Yellow Jackets");

        let frame = frames.next_frame(&state, None, at(1));

        assert_eq!(frame.blue.goals, 2);
        assert_eq!(frame.yellow.name, "Yellow Jackets");
        assert_eq!(frame.stage, Stage::PreGame);
    }

    #[tokio::test]
    async fn frames_arrive_as_json_datagrams() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = receiver.local_addr().unwrap().to_string();
        let (publisher, _handle) = UdpPublisher::bind(&address).await.unwrap();
        assert_eq!(publisher.target().to_string(), address);

        let goal = EventCommand::for_team(CommandKind::Goal, Team::Yellow);
        publisher.publish(&MatchState::default(), Some(&goal));

        let mut buf = vec![0_u8; 4096];
        let len = receiver.recv(&mut buf).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(buf.get(..len).unwrap()).unwrap();

        assert_eq!(json["command_counter"], 1);
        assert_eq!(json["command"]["command"], "Goal");
        assert_eq!(json["command"]["for_team"], "Yellow");
        assert_eq!(json["stage"], "PreGame");
    }

    #[tokio::test]
    async fn unresolvable_address_fails() {
        let result = UdpPublisher::bind("not an address").await;
        assert!(matches!(result, Err(PublisherError::Resolve { .. })));
    }
}
