//! Session model, bearer tokens, identifiers, and the auth operations that tie them together.

pub mod id;
pub mod service;
pub mod session;
pub mod token;

pub use id::*;
pub use service::*;
pub use session::*;
pub use token::*;
