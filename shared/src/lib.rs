pub mod realtime;
pub mod types;
