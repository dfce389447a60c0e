pub mod queue;
pub mod worker;

pub use queue::Queue;
pub use worker::Worker;
