//! Participant side of a shared drawing room.
//!
//! [`SyncClient`] turns pointer input into intents and server events into a
//! local [`Replica`]; [`TransportHandle`] carries it over a websocket and
//! reconnects when the socket drops. Drawing is delegated to a [`Renderer`].

pub mod render;
pub mod replica;
pub mod session;
pub mod transport;

pub use render::{Composite, NullRenderer, Paint, Renderer, paint, polyline};
pub use replica::{Cursor, Replica, Repaint};
pub use session::{ClientConfig, ConnectionStatus, SyncClient};
pub use transport::{SharedClient, TransportError, TransportHandle};
