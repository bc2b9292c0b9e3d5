//! CLI command implementations.

mod ask;
mod config;
mod rooms;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use rooms::{run_create_room, run_rooms};
pub use serve::{router, run_serve};
