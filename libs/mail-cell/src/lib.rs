pub mod error;
pub mod models;
pub mod transport;
pub mod renderer;
pub mod mailer;
pub mod jobs;

pub use error::*;
pub use models::*;
pub use transport::*;
pub use renderer::*;
pub use mailer::*;
pub use jobs::*;
