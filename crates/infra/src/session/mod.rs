//! Session provider adapters.

pub mod gotrue;
pub mod static_sessions;

pub use gotrue::{GoTrueConfig, GoTrueSessionProvider};
pub use static_sessions::StaticSessionProvider;
