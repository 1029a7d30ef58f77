//! Proxy module - prefix-routed dev server front end

pub mod handlers;
pub mod rule;
pub mod server;
pub mod upstream;

pub use rule::{ProxyRule, RuleError, RuleSet};
pub use server::ProxyServer;
