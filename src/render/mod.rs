//! Canvas adapters and the backend registry.

pub(crate) mod adapter;
pub(crate) mod canvas2d;
pub(crate) mod gl;
pub(crate) mod registry;
pub(crate) mod scene3d;
