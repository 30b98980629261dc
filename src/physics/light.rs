//! One dimensional light buffers.
//!
//! A light buffer stores, per angular (or horizontal) bucket, the distance to the nearest
//! thing that blocks light. Occluders are drawn into it as line segments, and the
//! per object [`cache::LBufferCache`] lets objects that did not move skip the geometry.

use bevy::app::{App, Last, Plugin};
use bevy::ecs::system::Query;

pub mod buffer;
pub mod cache;
pub mod types;

use self::cache::LBufferCache;

/// Keeps the light buffer caches in the world ticking.
pub struct LightBufferPlugin;

impl Plugin for LightBufferPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Last, LightBufferPlugin::age_light_buffer_caches);
    }
}

impl LightBufferPlugin {
    /// Runs once per frame after everything has drawn, so entries used this frame survive
    fn age_light_buffer_caches(mut caches: Query<&mut LBufferCache>) {
        for mut cache in caches.iter_mut() {
            cache.update();
        }
    }
}
