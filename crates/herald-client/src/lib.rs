pub mod domains;
pub mod engine;
pub mod fetcher;
pub mod guard;

pub use domains::ConfiguredAllowlist;
pub use engine::{NewsEngine, build_engine};
pub use fetcher::ReqwestFetcher;
