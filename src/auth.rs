//! Identity tokens, session credentials, user context, and the exchange that links them.

pub mod context;
pub mod id;
pub mod provider;
pub mod session;
pub mod token;

pub use context::*;
pub use id::*;
pub use provider::*;
pub use session::*;
pub use token::*;
