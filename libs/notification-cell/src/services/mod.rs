pub mod store;
pub mod memory_store;
pub mod supabase_store;
pub mod dispatcher;

pub use store::*;
pub use memory_store::*;
pub use supabase_store::*;
pub use dispatcher::*;
