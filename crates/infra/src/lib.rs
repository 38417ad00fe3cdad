//! Infrastructure layer: storage, hosted auth and notification adapters for
//! the ports declared in `tenantgate-auth`.

pub mod directory;
pub mod notify;
pub mod session;


pub use directory::{InMemoryDirectory, PostgresDirectory};
pub use notify::{RecordingNotifier, SentNotice, TracingNotifier, WebhookNotifier};
pub use session::{GoTrueConfig, GoTrueSessionProvider, StaticSessionProvider};
