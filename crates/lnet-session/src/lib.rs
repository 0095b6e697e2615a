//! LNet master session.
//!
//! A [`Session`] owns one transport and turns service calls into
//! request/response exchanges. Exchanges never overlap: callers on other
//! threads queue up and are served in the order they arrived.

#[cfg(feature = "async")]
pub mod async_session;
pub mod config;
pub mod connector;
pub mod error;
pub mod session;
mod turnstile;

#[cfg(feature = "async")]
pub use async_session::AsyncSession;
pub use config::SessionConfig;
pub use connector::{connect, connect_tcp, connect_with_config};
pub use error::{Result, SessionError};
pub use session::Session;
