//! Task records and the operations on them.

mod memory;
mod record;
mod service;

pub use memory::MemoryTaskStore;
pub use record::{TaskRecord, TaskStore};
pub use service::{complete_task, delete_task, repeat_task};
