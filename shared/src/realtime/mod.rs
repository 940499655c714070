pub mod messages;

pub use messages::{ClientMessage, PushMessage};
