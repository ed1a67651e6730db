//! Asset Resolver & Cache.

pub(crate) mod cache;
pub(crate) mod loader;
pub(crate) mod resolve;
