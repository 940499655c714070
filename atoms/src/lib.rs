pub mod achievements;
pub mod error;
pub mod feed;
pub mod media;
pub mod progression;
pub mod shifts;
pub mod store;
pub mod tasks;
pub mod time;
pub mod users;

pub use error::EngineError;

pub type Result<T> = std::result::Result<T, EngineError>;
