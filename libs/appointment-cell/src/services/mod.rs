pub mod clock;
pub mod store;
pub mod memory_store;
pub mod supabase_store;
pub mod booking;
pub mod cancellation;
pub mod listing;

pub use clock::*;
pub use store::*;
pub use memory_store::*;
pub use supabase_store::*;
pub use booking::*;
pub use cancellation::*;
pub use listing::*;
