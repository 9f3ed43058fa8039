//! Velvet core crate - configuration, errors, and domain types.
//!
//! Shared foundation for the Velvet assistant engine: the top-level error
//! type, TOML configuration, and the read-model entities (clubs, events,
//! orders) the conversational core queries.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ChatConfig, GeneralConfig, GeoConfig, LlmConfig, VelvetConfig};
pub use error::{Result, VelvetError};
pub use types::{
    ChatTurn, Club, Coordinates, Event, EventStatus, MenuItem, Order, OrderStatus, Role, Ticket,
    User,
};
