//! Data structures shared across the pipeline.

pub mod credentials;
pub mod note;
pub mod session;

pub use credentials::{Credentials, RemoteConfig};
pub use note::{strip_bullet, Note};
pub use session::Session;
