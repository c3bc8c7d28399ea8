use std::collections::{HashMap, HashSet};

use actix::prelude::*;
use uuid::Uuid;

use crate::models::realtime_events::ServerEvent;

/// Event delivered to a single websocket session.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct ServerEventMessage(pub ServerEvent);

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub session_id: Uuid,
    pub addr: Recipient<ServerEventMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub session_id: Uuid,
}

/// Join a competition room, leaving any other room first.
/// Resolves to the room that was left, if any.
#[derive(Message)]
#[rtype(result = "Option<String>")]
pub struct JoinRoom {
    pub session_id: Uuid,
    pub competition_id: String,
}

/// Resolves to whether the session was in that room.
#[derive(Message)]
#[rtype(result = "bool")]
pub struct LeaveRoom {
    pub session_id: Uuid,
    pub competition_id: String,
}

/// Fan an event out to its competition room. Resolves to the number of
/// sessions it was sent to.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct Relay(pub ServerEvent);

#[cfg(test)]
#[derive(Message)]
#[rtype(result = "usize")]
pub struct RoomSize {
    pub competition_id: String,
}

/// Per-process room registry. Membership is local to this instance; events
/// reach it only through the store relay.
#[derive(Default)]
pub struct LeaderboardBroadcaster {
    sessions: HashMap<Uuid, Recipient<ServerEventMessage>>,
    memberships: HashMap<Uuid, String>,
    rooms: HashMap<String, HashSet<Uuid>>,
}

impl LeaderboardBroadcaster {
    fn leave_current_room(&mut self, session_id: Uuid) -> Option<String> {
        let competition_id = self.memberships.remove(&session_id)?;
        if let Some(members) = self.rooms.get_mut(&competition_id) {
            members.remove(&session_id);
            if members.is_empty() {
                self.rooms.remove(&competition_id);
            }
        }
        Some(competition_id)
    }
}

impl Actor for LeaderboardBroadcaster {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Leaderboard broadcaster started");
    }
}

impl Handler<Connect> for LeaderboardBroadcaster {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) {
        self.sessions.insert(msg.session_id, msg.addr);
        tracing::debug!("Session {} registered ({} connected)", msg.session_id, self.sessions.len());
    }
}

impl Handler<Disconnect> for LeaderboardBroadcaster {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _ctx: &mut Self::Context) {
        self.sessions.remove(&msg.session_id);
        if let Some(competition_id) = self.leave_current_room(msg.session_id) {
            tracing::debug!("Session {} removed from room {}", msg.session_id, competition_id);
        }
    }
}

impl Handler<JoinRoom> for LeaderboardBroadcaster {
    type Result = Option<String>;

    fn handle(&mut self, msg: JoinRoom, _ctx: &mut Self::Context) -> Self::Result {
        if self.memberships.get(&msg.session_id) == Some(&msg.competition_id) {
            return None;
        }
        let previous = self.leave_current_room(msg.session_id);
        self.rooms
            .entry(msg.competition_id.clone())
            .or_default()
            .insert(msg.session_id);
        self.memberships.insert(msg.session_id, msg.competition_id.clone());
        tracing::info!(
            "Session {} joined room {} (left: {:?})",
            msg.session_id, msg.competition_id, previous
        );
        previous
    }
}

impl Handler<LeaveRoom> for LeaderboardBroadcaster {
    type Result = bool;

    fn handle(&mut self, msg: LeaveRoom, _ctx: &mut Self::Context) -> Self::Result {
        if self.memberships.get(&msg.session_id) != Some(&msg.competition_id) {
            return false;
        }
        self.leave_current_room(msg.session_id);
        tracing::info!("Session {} left room {}", msg.session_id, msg.competition_id);
        true
    }
}

impl Handler<Relay> for LeaderboardBroadcaster {
    type Result = usize;

    fn handle(&mut self, msg: Relay, _ctx: &mut Self::Context) -> Self::Result {
        let Some(competition_id) = msg.0.room() else {
            tracing::warn!("Dropping event without a competition room: {:?}", msg.0);
            return 0;
        };
        let Some(members) = self.rooms.get(competition_id) else {
            return 0;
        };

        let mut delivered = 0;
        for session_id in members {
            if let Some(addr) = self.sessions.get(session_id) {
                addr.do_send(ServerEventMessage(msg.0.clone()));
                delivered += 1;
            }
        }
        tracing::debug!("Relayed event to {} sessions in room {}", delivered, competition_id);
        delivered
    }
}

#[cfg(test)]
impl Handler<RoomSize> for LeaderboardBroadcaster {
    type Result = usize;

    fn handle(&mut self, msg: RoomSize, _ctx: &mut Self::Context) -> Self::Result {
        self.rooms.get(&msg.competition_id).map_or(0, HashSet::len)
    }
}
