// presence - realtime online-user tracking over WebSocket
//
// hub      in-memory registry of live sockets (broadcast, kick)
// events   connection events and the writer task that persists them
// socket   the /hubs/chat upgrade handler and per-socket loop
// messages JSON frames exchanged with clients

pub mod events;
pub mod hub;
pub mod messages;
pub mod socket;

pub use events::{spawn_writer, EventPublisher, PgPresenceStore, PresenceEvent, PresenceStore};
pub use hub::{HubClient, PresenceHub};
pub use messages::{ClientMessage, OnlineConnection, ServerMessage};
pub use socket::chat_hub;
