use actix;
use serde::Deserialize;

/// Serialized view state pushed from the pump task to the socket.
#[derive(actix::Message)]
#[rtype(result = "()")]
pub struct SnapshotMessage(pub String);

/// Commands a client may send over the socket.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Ping,
    /// Manual refresh: failures are reported to the client.
    Refresh,
}

/// Work forwarded from the actor to the task that owns the view.
#[derive(Debug)]
pub enum ViewCommand {
    Refresh,
}
