// * Static HTTP access: browser identity, ban detection, bounded downloads

pub mod client;
pub mod errors;
pub mod identity;

pub use client::FastClient;
pub use errors::NetworkError;
pub use identity::{IdentityProfile, IdentityRotator, USER_AGENTS};
