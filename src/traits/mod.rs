pub mod task;

pub use task::{SharedTask, Task};
