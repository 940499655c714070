pub mod model;
pub mod service;

pub use model::{AttendanceRecord, CreateShiftPayload, GeoPoint, Shift};
