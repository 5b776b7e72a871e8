use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use chrono::Utc;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::messages::{ClientCommand, SnapshotMessage, ViewCommand};
use crate::services::change_feed::ChangeFeed;
use crate::services::live_view::{LiveView, ViewData, ViewState};

// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

/// One websocket client watching one live view. The view is mounted when the
/// actor starts and unmounted when it stops.
pub struct LiveConnection<T: ViewData> {
    heartbeat: Instant,
    session_id: Uuid,
    view_name: String,
    view: Option<LiveView<T>>,
    change_feed: ChangeFeed,
    commands: Option<mpsc::UnboundedSender<ViewCommand>>,
}

impl<T: ViewData> Actor for LiveConnection<T> {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("🔗 LiveConnection started for {} view - session: {}", self.view_name, self.session_id);

        self.heartbeat(ctx);
        self.start_view_pump(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Closing the command channel stops the pump, which unmounts the view
        self.commands.take();
        tracing::info!("❌ LiveConnection stopped for {} view - session: {}", self.view_name, self.session_id);
    }
}

impl<T: ViewData> LiveConnection<T> {
    pub fn new(view: LiveView<T>, change_feed: ChangeFeed) -> Self {
        Self {
            heartbeat: Instant::now(),
            session_id: view.instance_id(),
            view_name: view.name().to_string(),
            view: Some(view),
            change_feed,
            commands: None,
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.heartbeat) > CLIENT_TIMEOUT {
                tracing::warn!("💔 Live client heartbeat missed, disconnecting session: {}", act.session_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"ping");
        });
    }

    /// Move the view into a task that mounts it and forwards every state
    /// change to the socket until the connection goes away.
    fn start_view_pump(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(view) = self.view.take() else {
            return;
        };
        let (tx, rx) = mpsc::unbounded_channel();
        self.commands = Some(tx);
        let addr = ctx.address();
        let feed = self.change_feed.clone();
        tokio::spawn(pump_view(view, feed, addr, rx));
    }

    fn handle_client_message(&self, message: &str, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::from_str::<ClientCommand>(message) {
            Ok(ClientCommand::Ping) => {
                let pong = json!({
                    "type": "pong",
                    "timestamp": Utc::now().to_rfc3339(),
                    "session_id": self.session_id
                });
                ctx.text(pong.to_string());
            }
            Ok(ClientCommand::Refresh) => {
                if let Some(commands) = &self.commands {
                    let _ = commands.send(ViewCommand::Refresh);
                }
            }
            Err(e) => {
                tracing::debug!("❓ Unknown command from session {}: {} ({})", self.session_id, message, e);
            }
        }
    }
}

pub(crate) fn snapshot_json<T: ViewData>(view: &str, state: &ViewState<T>) -> serde_json::Value {
    json!({
        "type": "snapshot",
        "view": view,
        "status": state.status(),
        "loading": state.loading,
        "error": state.error,
        "data": state.data,
        "timestamp": Utc::now().to_rfc3339()
    })
}

async fn pump_view<T: ViewData>(
    mut view: LiveView<T>,
    feed: ChangeFeed,
    addr: Addr<LiveConnection<T>>,
    mut commands: mpsc::UnboundedReceiver<ViewCommand>,
) {
    let name = view.name().to_string();
    let mut updates = view.watch();

    // Whatever is there before the first fetch (possibly cached data)
    let initial = snapshot_json(&name, &updates.borrow_and_update());
    addr.do_send(SnapshotMessage(initial.to_string()));

    if let Err(e) = view.mount(&feed).await {
        tracing::error!("❌ Failed to mount {} view: {}", name, e);
        let error = json!({
            "type": "error",
            "view": name,
            "message": e.to_string()
        });
        addr.do_send(SnapshotMessage(error.to_string()));
        return;
    }

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ViewCommand::Refresh) => {
                    view.load().await;
                }
                None => break,
            },
            changed = updates.changed() => {
                if changed.is_err() || !addr.connected() {
                    break;
                }
                let snapshot = snapshot_json(&name, &updates.borrow_and_update());
                addr.do_send(SnapshotMessage(snapshot.to_string()));
            }
        }
    }

    view.unmount();
}

impl<T: ViewData> Handler<SnapshotMessage> for LiveConnection<T> {
    type Result = ();

    fn handle(&mut self, msg: SnapshotMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl<T: ViewData> StreamHandler<Result<ws::Message, ws::ProtocolError>> for LiveConnection<T> {
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
                tracing::warn!("⚠️  Received unexpected binary message from session: {}", self.session_id);
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("🔒 Live WebSocket closing for session {}: {:?}", self.session_id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}
