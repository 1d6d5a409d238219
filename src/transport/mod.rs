//! Push transport: a shared handler registry fed by one websocket
//! connection to the backend's Socket.IO server.

pub mod connection;
pub mod frame;
pub mod hub;

pub use connection::{socket_endpoint, PushConnection, PushSettings, TransportError};
pub use frame::{Frame, FrameError};
pub use hub::{EventHandler, PushHub, Subscription, SubscriptionId};
