pub mod api_types;
mod cached_client;
mod client;
mod pages;
pub mod types;

pub use cached_client::CachedKenallClient;
pub use client::{KenallClient, DEFAULT_BASE_URL};
pub use pages::CorporatePages;
pub use types::*;
