//! Config Normalizer: authored scene documents into canonical layer records.

pub(crate) mod model;
pub(crate) mod normalize;
pub(crate) mod presets;
