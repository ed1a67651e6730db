//! Transform composition and the render-facing stage object contract.

pub(crate) mod stage_object;
pub(crate) mod transform;
