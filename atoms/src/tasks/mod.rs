pub mod model;
pub mod service;

pub use model::{CreateTaskPayload, Priority, Task, TaskStatus, UpdateTaskPayload};
