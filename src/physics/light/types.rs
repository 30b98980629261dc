//! Types for light physics.

use bevy::math::Vec2;
use derive_more::{From, Into};
use strum_macros::{Display, EnumIter};

/// How the buckets of a light buffer are laid out around the light.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Projection {
    /// Buckets are equal angle slices of one full turn around the origin,
    /// counter clockwise from the positive x axis.
    /// Values are distances from the origin.
    #[default]
    Polar,
    /// Buckets are equal intervals of the x axis over the domain extent.
    /// Values are depths along positive y.
    Linear,
}

/// A single write-min produced by drawing into a light buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketWrite {
    /// The bucket written to
    pub index: usize,
    /// The candidate occluder distance
    pub value: f32,
}

/// Receives every write a draw produces, in order.
/// Used to record draws so they can be replayed without redoing the geometry.
pub trait WriteRecorder {
    fn record_write(&mut self, write: BucketWrite);
}

/// Draws that nobody needs to remember
impl WriteRecorder for () {
    fn record_write(&mut self, _write: BucketWrite) {}
}

impl WriteRecorder for Vec<BucketWrite> {
    fn record_write(&mut self, write: BucketWrite) {
        self.push(write);
    }
}

/// A caller managed handle for something that casts shadows into a light buffer.
/// The cache only ever compares these, it never looks up what they point to.
/// Inside an ECS world the bevy `Entity` plays the same role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, From, Into)]
pub struct ObjectId(pub u64);

/// An object whose shadow can be cached.
/// Position and size are what the cache compares to decide if a recorded draw is still valid.
pub trait ProjectedObject {
    fn position(&self) -> Vec2;
    fn size(&self) -> Vec2;
}
