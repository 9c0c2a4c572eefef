// hermes-link: WebSocket link to a Hermes hardware controller

pub mod error;
pub mod protocol;
pub mod reconnect;
pub mod websocket;

pub use error::Error;
pub use protocol::{ClientEvent, HandshakePayload, ServerEvent};
pub use reconnect::{LinkState, ReconnectConfig, SessionMachine, Step, calculate_backoff};
pub use websocket::{Link, LinkEvent, LinkHandle, parse_endpoint};
