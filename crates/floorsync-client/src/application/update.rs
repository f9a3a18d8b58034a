//! Client Update System: the gameplay thread's view of the network.
//!
//! Once per simulation tick the gameplay loop calls
//! [`ClientUpdateSystem::pull_and_apply`].  It asks the packet source for a
//! batch, reads the packet count, then reads and applies exactly that many
//! packets:
//!
//! ```text
//! request_batch()
//! read [count:u32]
//!   count == SHUTDOWN_SENTINEL → read [len:u32][message], reset, Shutdown
//!   otherwise, count times     → read [type:u32][payload], dispatch
//! ```
//!
//! Every packet of a batch is always read off the source, even when it is
//! ignored (denied session, pending floor change, undecodable payload).
//! Skipping the read would leave the next tick parsing payload bytes as a
//! type word.
//!
//! # How server state becomes world state (for beginners)
//!
//! The server talks about "player 3" and "objective 12".  The world talks
//! about [`EntityId`](super::world::EntityId)s.  The session's
//! synchronization tables remember which entity stands for which server id,
//! so a status packet saying "player 3 is gone" turns into
//! `world.despawn(entity_of_player_3)`.  Slots are filled lazily: the first
//! status packet that marks a player valid spawns its entity.

use floorsync_core::protocol::{
    decode_payload, decode_type, AllPositionUpdateMessage, ClientLobbyMessage,
    ConnectAcceptMessage, ConnectCode, FloorMoveMessage, FloorMoveRequestMessage,
    GameStatusMessage, Message, PacketType, PlayerMotion, PositionUpdateRequestMessage, Team,
    MAX_PLAYERS, SHUTDOWN_SENTINEL,
};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::session::SessionState;
use super::sync_table::PlayerBinding;
use super::world::{appearance_for, role_for, Direction, World};

/// Longest shutdown message accepted from the source.
const MAX_SHUTDOWN_MESSAGE: usize = 4096;

/// Failure reading from a [`PacketSource`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The producer side is gone; no more bytes will arrive.
    #[error("packet source closed")]
    Closed,
}

/// Where batches come from.
///
/// The network router implements this over its inbound pipe.  Tests script
/// the byte stream directly.
pub trait PacketSource {
    /// Tells the producer the consumer is about to read one batch.
    fn request_batch(&mut self);

    /// Blocks until exactly `buf.len()` bytes are read.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), SourceError>;
}

fn read_u32<S: PacketSource + ?Sized>(source: &mut S) -> Result<u32, SourceError> {
    let mut word = [0u8; 4];
    source.read_exact(&mut word)?;
    Ok(u32::from_be_bytes(word))
}

/// Result of one [`ClientUpdateSystem::pull_and_apply`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The whole batch was consumed.
    Ok,
    /// The server refused this client.  The rest of the batch was discarded.
    Denied,
    /// No session yet; the source was not touched.
    NotReady,
    /// The network layer shut down.  Carries the reason.
    Shutdown(String),
}

enum Applied {
    Continue,
    Denied,
}

/// Applies server batches to the world.
#[derive(Debug, Default)]
pub struct ClientUpdateSystem {
    session: SessionState,
}

impl ClientUpdateSystem {
    /// Creates a system with empty tables that is not yet ready to pull.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the tables and flags this system maintains.
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Allows [`ClientUpdateSystem::pull_and_apply`] to read from the network.
    pub fn begin_session(&mut self) {
        self.session.ready = true;
        info!("network session ready");
    }

    /// `true` between [`ClientUpdateSystem::begin_session`] and the next shutdown.
    pub fn is_ready(&self) -> bool {
        self.session.ready
    }

    /// Pulls one batch from `source` and applies it to `world`.
    pub fn pull_and_apply<S, W>(&mut self, source: &mut S, world: &mut W) -> PullOutcome
    where
        S: PacketSource + ?Sized,
        W: World + ?Sized,
    {
        if !self.session.ready {
            return PullOutcome::NotReady;
        }

        source.request_batch();
        let count = match read_u32(source) {
            Ok(count) => count,
            Err(err) => return self.shut_down(format!("inbound pipe failed: {err}")),
        };
        if count == SHUTDOWN_SENTINEL {
            let message = read_shutdown_message(source)
                .unwrap_or_else(|err| format!("inbound pipe failed: {err}"));
            return self.shut_down(message);
        }

        let mut denied = false;
        for _ in 0..count {
            let word = match read_u32(source) {
                Ok(word) => word,
                Err(err) => return self.shut_down(format!("inbound pipe failed: {err}")),
            };
            let packet_type = match decode_type(word) {
                Ok(t) => t,
                Err(err) => return self.shut_down(format!("inbound pipe out of sync: {err}")),
            };
            let mut payload = vec![0u8; packet_type.payload_size()];
            if let Err(err) = source.read_exact(&mut payload) {
                return self.shut_down(format!("inbound pipe failed: {err}"));
            }

            if denied {
                continue;
            }
            if self.session.floor_change_pending && packet_type != PacketType::FloorMove {
                trace!(?packet_type, "floor change pending; packet discarded");
                continue;
            }
            let message = match decode_payload(packet_type, &payload) {
                Ok(message) => message,
                Err(err) => {
                    warn!(%err, ?packet_type, "dropping undecodable packet");
                    continue;
                }
            };
            if let Applied::Denied = self.apply(message, world) {
                denied = true;
            }
        }

        if denied {
            PullOutcome::Denied
        } else {
            PullOutcome::Ok
        }
    }

    // ── Outbound requests ─────────────────────────────────────────────────────

    /// Join request sent right after connecting.
    pub fn connect_request(name: &str, team: Team) -> Message {
        Message::ConnectAccept(ConnectAcceptMessage {
            connect_code: ConnectCode::Requested,
            player_id: 0,
            team,
            name: name.to_string(),
        })
    }

    /// Starts a floor change and returns the request to send.
    ///
    /// Until the server's floor-move arrives, every other packet is
    /// discarded.  Returns `None` before the server has accepted this client.
    pub fn request_floor_move(&mut self, target_floor: u32) -> Option<Message> {
        let player_id = self.session.my_player_id?;
        self.session.floor_change_pending = true;
        debug!(target_floor, "floor change requested");
        Some(Message::FloorMoveRequest(FloorMoveRequestMessage {
            player_id: player_id as u32,
            current_floor: self.session.current_floor,
            target_floor,
        }))
    }

    /// This client's own position for the server.  `None` before acceptance.
    pub fn position_report(&self, motion: PlayerMotion) -> Option<Message> {
        let player_id = self.session.my_player_id?;
        Some(Message::PositionUpdateRequest(PositionUpdateRequestMessage {
            player_id: player_id as u32,
            floor: self.session.current_floor,
            motion,
        }))
    }

    /// Lobby selection for the server.  `None` before acceptance.
    pub fn lobby_report(&self, team: Team, character: u8, ready: bool) -> Option<Message> {
        let player_id = self.session.my_player_id?;
        Some(Message::ClientLobby(ClientLobbyMessage {
            player_id: player_id as u32,
            team,
            character: u32::from(character),
            ready,
        }))
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn apply<W: World + ?Sized>(&mut self, message: Message, world: &mut W) -> Applied {
        match message {
            Message::ConnectAccept(m) => return self.on_connect(&m, world),
            Message::GameStatus(m) => self.on_game_status(&m, world),
            Message::Chat(m) => world.push_chat(m.sender, &m.text),
            Message::ObjectiveLocation(m) => {
                self.session.objectives.cache_statuses(&m.statuses);
                self.apply_objective_statuses(world);
            }
            Message::ObjectiveStatus(m) => {
                self.session.game_state = m.game_state;
                if m.game_state.is_terminal() {
                    self.session.active_team = None;
                }
                self.session.objectives.cache_statuses(&m.statuses);
                self.apply_objective_statuses(world);
            }
            Message::AllPositionUpdate(m) => self.on_positions(&m, world),
            Message::FloorMove(m) => self.on_floor_move(&m, world),
            Message::Tagging(m) => {
                debug!(tagger = m.tagger_id, objective = m.objective_id, "tag confirmed");
            }
            Message::ClientLobby(_)
            | Message::PositionUpdateRequest(_)
            | Message::FloorMoveRequest(_) => {
                debug!("ignoring client-bound copy of a client request");
            }
            Message::KeepAlive => {}
        }
        Applied::Continue
    }

    fn on_connect<W: World + ?Sized>(&mut self, m: &ConnectAcceptMessage, world: &mut W) -> Applied {
        match m.connect_code {
            ConnectCode::Denied => {
                warn!("server denied the connection");
                return Applied::Denied;
            }
            ConnectCode::Requested => {
                warn!("server echoed a connect request; ignored");
                return Applied::Continue;
            }
            ConnectCode::Accepted => {}
        }

        let id = m.player_id as usize;
        if id >= MAX_PLAYERS {
            warn!(player_id = m.player_id, "connect accept names an impossible player id");
            return Applied::Continue;
        }

        let me = world.controllable_player();
        if let Some(old_id) = self.session.players.find(me) {
            self.session.players.unbind(old_id);
        }
        let binding = PlayerBinding {
            entity: me,
            team: m.team,
        };
        if let Some(previous) = self.session.players.bind(id, binding) {
            if previous.entity != me {
                world.despawn(previous.entity);
            }
        }
        world.set_role(me, role_for(m.team));

        self.session.my_player_id = Some(id);
        self.session.my_team = m.team;
        self.session.active_team = Some(m.team);
        info!(player_id = id, team = ?m.team, name = %m.name, "connection accepted");
        Applied::Continue
    }

    fn on_game_status<W: World + ?Sized>(&mut self, m: &GameStatusMessage, world: &mut W) {
        self.session.game_state = m.game_state;
        if m.game_state.is_terminal() {
            self.session.active_team = None;
        }

        let me = world.controllable_player();
        for (id, status) in m.players.iter().enumerate() {
            let current = self.session.players.get(id);

            if self.session.is_me(id) {
                if status.valid && status.team != self.session.my_team {
                    self.session.my_team = status.team;
                    world.set_role(me, role_for(status.team));
                    self.session.players.bind(
                        id,
                        PlayerBinding {
                            entity: me,
                            team: status.team,
                        },
                    );
                }
                continue;
            }

            match (status.valid, current) {
                (true, Some(binding)) if world.is_alive(binding.entity) => {
                    if binding.team != status.team {
                        world.set_role(binding.entity, role_for(status.team));
                        world.load_appearance(
                            binding.entity,
                            appearance_for(status.team, status.character),
                        );
                        self.session.players.bind(
                            id,
                            PlayerBinding {
                                entity: binding.entity,
                                team: status.team,
                            },
                        );
                        debug!(player_id = id, team = ?status.team, "player changed team");
                    }
                }
                (true, _) => {
                    let entity = world.spawn_player(
                        appearance_for(status.team, status.character),
                        role_for(status.team),
                    );
                    if let Some(stale) = self.session.players.bind(
                        id,
                        PlayerBinding {
                            entity,
                            team: status.team,
                        },
                    ) {
                        if stale.entity != me && stale.entity != entity {
                            world.despawn(stale.entity);
                        }
                    }
                    debug!(player_id = id, ?entity, team = ?status.team, "player joined");
                }
                (false, Some(binding)) => {
                    if binding.entity != me {
                        world.despawn(binding.entity);
                    }
                    self.session.players.unbind(id);
                    debug!(player_id = id, "player left");
                }
                (false, None) => {}
            }
        }
    }

    fn on_positions<W: World + ?Sized>(&mut self, m: &AllPositionUpdateMessage, world: &mut W) {
        if m.floor != self.session.current_floor {
            trace!(floor = m.floor, "position batch for another floor");
            return;
        }

        let me = world.controllable_player();
        for (id, binding) in self.session.players.iter() {
            if self.session.is_me(id) || binding.entity == me {
                continue;
            }
            if m.is_on_floor(id) {
                let motion = m.players[id];
                world.set_active(binding.entity, true);
                world.set_velocity(
                    binding.entity,
                    motion.vx,
                    motion.vy,
                    Direction::from_velocity(motion.vx, motion.vy),
                );
                world.place(binding.entity, motion.x, motion.y, m.floor);
            } else {
                world.set_active(binding.entity, false);
            }
        }
    }

    fn on_floor_move<W: World + ?Sized>(&mut self, m: &FloorMoveMessage, world: &mut W) {
        let me = world.controllable_player();
        world.place(me, m.x, m.y, m.new_floor);
        self.session.current_floor = m.new_floor;
        world.request_floor_rebuild(m.new_floor);

        let objectives = world.objective_entities();
        let bound = self
            .session
            .objectives
            .rebind_floor(m.new_floor, &objectives);
        self.apply_objective_statuses(world);
        self.session.floor_change_pending = false;
        info!(floor = m.new_floor, objectives = bound, "moved to floor");
    }

    fn apply_objective_statuses<W: World + ?Sized>(&self, world: &mut W) {
        for (entity, status) in self
            .session
            .objectives
            .statuses_for_floor(self.session.current_floor)
        {
            world.set_objective_status(entity, status);
        }
    }

    fn shut_down(&mut self, message: String) -> PullOutcome {
        self.session.reset();
        info!(reason = %message, "network session ended");
        PullOutcome::Shutdown(message)
    }
}

/// Reads `[len:u32][message]` after the sentinel.
///
/// Messages longer than [`MAX_SHUTDOWN_MESSAGE`] are truncated to that many
/// bytes; the rest is read and thrown away so the source stays framed.
fn read_shutdown_message<S: PacketSource + ?Sized>(source: &mut S) -> Result<String, SourceError> {
    let len = read_u32(source)? as usize;
    let kept = len.min(MAX_SHUTDOWN_MESSAGE);
    let mut text = vec![0u8; kept];
    source.read_exact(&mut text)?;

    let mut remaining = len - kept;
    if remaining > 0 {
        warn!(len, "shutdown message truncated to {MAX_SHUTDOWN_MESSAGE} bytes");
        let mut scratch = [0u8; MAX_SHUTDOWN_MESSAGE];
        while remaining > 0 {
            let step = remaining.min(scratch.len());
            source.read_exact(&mut scratch[..step])?;
            remaining -= step;
        }
    }
    Ok(String::from_utf8_lossy(&text).into_owned())
}
