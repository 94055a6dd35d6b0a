pub mod queue;
pub mod memory;
pub mod redis_queue;
pub mod producer;
pub mod worker;

pub use queue::*;
pub use memory::*;
pub use redis_queue::*;
pub use producer::*;
pub use worker::*;
