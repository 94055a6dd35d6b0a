pub mod bootstrap;
pub mod router;

pub use bootstrap::{Application, Backends};
pub use router::create_router;
