use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web_actors::ws;
use chrono::Utc;
use uuid::Uuid;

use crate::config::settings::RealtimeSettings;
use crate::models::realtime_events::{ClientMessage, ServerEvent};
use crate::realtime::broadcaster::{
    Connect, Disconnect, JoinRoom, LeaderboardBroadcaster, LeaveRoom, ServerEventMessage,
};
use crate::services::leaderboard_service::{LeaderboardService, DEFAULT_LEADERBOARD_LIMIT};

/// One websocket client of the leaderboard feed.
///
/// Lifecycle: connected on start, subscribed to at most one competition room
/// at a time, removed from every room when stopped.
pub struct LeaderboardSession {
    session_id: Uuid,
    heartbeat: Instant,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    competition_id: Option<String>,
    broadcaster: Addr<LeaderboardBroadcaster>,
    leaderboard: LeaderboardService,
}

impl Actor for LeaderboardSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("🔗 Leaderboard session started - session: {}", self.session_id);

        self.heartbeat(ctx);
        self.broadcaster.do_send(Connect {
            session_id: self.session_id,
            addr: ctx.address().recipient(),
        });
        self.send_event(
            ctx,
            &ServerEvent::Connected {
                message: "Connected to leaderboard updates".to_string(),
                timestamp: Utc::now(),
            },
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.broadcaster.do_send(Disconnect {
            session_id: self.session_id,
        });
        tracing::info!("❌ Leaderboard session stopped - session: {} (room: {:?})",
            self.session_id, self.competition_id);
    }
}

impl LeaderboardSession {
    pub fn new(
        broadcaster: Addr<LeaderboardBroadcaster>,
        leaderboard: LeaderboardService,
        settings: &RealtimeSettings,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            heartbeat: Instant::now(),
            heartbeat_interval: Duration::from_secs(settings.heartbeat_interval_secs),
            client_timeout: Duration::from_secs(settings.client_timeout_secs),
            competition_id: None,
            broadcaster,
            leaderboard,
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.heartbeat) > act.client_timeout {
                tracing::warn!("💔 Client heartbeat missed, disconnecting session: {}", act.session_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"ping");
        });
    }

    fn send_event(&self, ctx: &mut ws::WebsocketContext<Self>, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(text) => ctx.text(text),
            Err(e) => tracing::error!("Failed to serialize event for session {}: {}", self.session_id, e),
        }
    }

    fn handle_client_message(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("❓ Unreadable message from session {}: {}", self.session_id, e);
                self.send_event(ctx, &ServerEvent::error("Invalid message format"));
                return;
            }
        };

        match message {
            ClientMessage::Subscribe { competition_id } => match non_empty(competition_id) {
                Some(competition_id) => self.subscribe(competition_id, ctx),
                None => self.send_event(ctx, &ServerEvent::error("Competition ID is required")),
            },
            ClientMessage::Unsubscribe { competition_id } => match non_empty(competition_id) {
                Some(competition_id) => self.unsubscribe(competition_id, ctx),
                None => self.send_event(ctx, &ServerEvent::error("Competition ID is required")),
            },
            ClientMessage::Ping => {
                self.send_event(ctx, &ServerEvent::Pong { timestamp: Utc::now() });
            }
        }
    }

    /// The ack goes out only after the broadcaster has registered the join,
    /// so no event published after the ack can be missed. The current board
    /// follows the ack, for this session only.
    fn subscribe(&mut self, competition_id: String, ctx: &mut ws::WebsocketContext<Self>) {
        self.broadcaster
            .send(JoinRoom {
                session_id: self.session_id,
                competition_id: competition_id.clone(),
            })
            .into_actor(self)
            .then(move |result, act, ctx| {
                match result {
                    Ok(_) => {
                        tracing::info!("📡 Session {} subscribed to {}", act.session_id, competition_id);
                        act.competition_id = Some(competition_id.clone());
                        act.send_event(
                            ctx,
                            &ServerEvent::Subscribed {
                                message: format!("Subscribed to competition {}", competition_id),
                                competition_id: competition_id.clone(),
                            },
                        );
                        act.send_initial_leaderboard(competition_id, ctx);
                    }
                    Err(e) => {
                        tracing::error!("Broadcaster unavailable for session {}: {}", act.session_id, e);
                        act.send_event(ctx, &ServerEvent::error("Subscription failed"));
                    }
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn send_initial_leaderboard(&self, competition_id: String, ctx: &mut ws::WebsocketContext<Self>) {
        let leaderboard = self.leaderboard.clone();
        let requested = competition_id.clone();
        let load = async move {
            leaderboard
                .get_leaderboard(&requested, DEFAULT_LEADERBOARD_LIMIT)
                .await
        };

        ctx.spawn(load.into_actor(self).map(move |result, act, ctx| {
            // The client may have moved to another room while the board loaded.
            if act.competition_id.as_deref() != Some(competition_id.as_str()) {
                return;
            }
            match result {
                Ok(data) => act.send_event(
                    ctx,
                    &ServerEvent::LeaderboardUpdate {
                        competition_id,
                        data,
                        timestamp: Utc::now(),
                    },
                ),
                Err(e) => tracing::error!(
                    "Failed to load initial leaderboard {} for session {}: {}",
                    competition_id, act.session_id, e
                ),
            }
        }));
    }

    fn unsubscribe(&mut self, competition_id: String, ctx: &mut ws::WebsocketContext<Self>) {
        self.broadcaster
            .send(LeaveRoom {
                session_id: self.session_id,
                competition_id: competition_id.clone(),
            })
            .into_actor(self)
            .then(move |result, act, ctx| {
                if let Ok(true) = result {
                    act.competition_id = None;
                }
                tracing::info!("Session {} unsubscribed from {}", act.session_id, competition_id);
                act.send_event(
                    ctx,
                    &ServerEvent::Unsubscribed {
                        message: format!("Unsubscribed from competition {}", competition_id),
                        competition_id,
                    },
                );
                fut::ready(())
            })
            .wait(ctx);
    }
}

fn non_empty(competition_id: Option<String>) -> Option<String> {
    competition_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

impl Handler<ServerEventMessage> for LeaderboardSession {
    type Result = ();

    fn handle(&mut self, msg: ServerEventMessage, ctx: &mut Self::Context) {
        self.send_event(ctx, &msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for LeaderboardSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.heartbeat = Instant::now();
                self.handle_client_message(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("⚠️  Unexpected binary message from session: {}", self.session_id);
                self.send_event(ctx, &ServerEvent::error("Binary messages are not supported"));
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("🔒 Leaderboard session {} closing: {:?}", self.session_id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}
