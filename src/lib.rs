//! Layerstage is a declarative layer-animation and scene-composition engine.
//!
//! A scene is a JSON list of image layers, each optionally carrying behaviors (spin, orbit,
//! wall-clock hands, opacity/scale effects). The engine:
//!
//! - Normalizes a loosely-typed [`SceneConfig`] into canonical [`NormalizedLayer`]s
//! - Resolves and prefetches every referenced image once through an [`AssetCache`]
//! - Composes per-frame transforms and hands [`StageObject`]s to a [`CanvasAdapter`]
//! - Drives ticks, resizes and teardown from [`Host`] events via [`StageEngine`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod assets;
pub(crate) mod compose;
pub(crate) mod engine;
pub(crate) mod render;
pub(crate) mod scene;

pub use crate::foundation::clock::{Clock, ManualClock, SceneClock, SystemClock};
pub use crate::foundation::core::{
    Affine, FrameTime, Point, Rect, StageOrigin, Surface, Vec2, Vec3,
};
pub use crate::foundation::error::{StageError, StageResult};
pub use crate::foundation::math::normalize360;

pub use crate::animation::clock::{ClockConfig, ClockHand, ClockState};
pub use crate::animation::ease::Ease;
pub use crate::animation::effects::{
    EffectItem, EffectKind, EffectsConfig, MAX_EFFECT_FREQUENCY_HZ, PropertyAdjust,
};
pub use crate::animation::orbit::{OrbitConfig, OrbitState};
pub use crate::animation::spin::{SpinConfig, SpinState};
pub use crate::animation::window::{ActivationWindow, Direction, resolve_speed};
pub use crate::animation::{Behaviors, MotionResolver};

pub use crate::scene::model::{
    Align, ClockDef, EffectDef, EffectKindDef, EffectsDef, Fit, LayerDef, Loose, OrbitDef,
    PresetDef, SceneConfig, SpinDef, VecDef,
};
pub use crate::scene::normalize::{
    ConfigWarning, ImageRef, NormalizedLayer, NormalizedScene, SCENE_SCHEMA_VERSION,
    normalize_scene, normalize_scene_with,
};
pub use crate::scene::presets::PresetLibrary;

pub use crate::compose::stage_object::{
    RenderMode, Rotation, StageMetadata, StageObject, apply_composed, to_stage_object,
};
pub use crate::compose::transform::{
    ComposedTransform, PositionSource, RotationSource, compose, select_angle,
};

pub use crate::assets::cache::{AssetCache, PrefetchReport};
pub use crate::assets::loader::{FileLoader, Resource, ResourceLoader, decode_image};
pub use crate::assets::resolve::{AssetManifest, AssetResolver, ImageRegistry, StaticManifest};

pub use crate::render::adapter::{AdapterSettings, AdapterStats, CanvasAdapter, Placement, place};
pub use crate::render::canvas2d::{Canvas2dAdapter, DrawCommand};
pub use crate::render::gl::{DrawCall, GlAdapter, MAX_VIEWPORT, TextureSlot, Vertex};
pub use crate::render::registry::{
    AdapterFactory, AdapterRegistry, BackendChoice, DeviceCapabilities, global, install_global,
};
pub use crate::render::scene3d::{DEPTH_STEP, OrthoCamera, PlaneNode, Scene3dAdapter};

pub use crate::engine::host::{HeadlessHost, Host, HostEvent, HostEventKind, Subscription};
pub use crate::engine::stage::{
    BuildReport, EngineOpts, EngineStats, SkipReason, SkippedLayer, StageEngine, TickOutcome,
};
