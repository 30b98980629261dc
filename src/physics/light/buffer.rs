//! The light buffer.
//!
//! A one dimensional array of occluder distances around a light source at the origin.
//! Each bucket covers an equal slice of the domain, either an angle slice of one full
//! turn ([`Projection::Polar`]) or an interval of the x axis ([`Projection::Linear`]).
//! Drawing a segment casts one ray per bucket it might cover and keeps the smallest
//! distance seen in each bucket, so the closest occluder always wins no matter the
//! order things are drawn in.
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::error::Error;
use std::f32::consts::{PI, TAU};
use std::fmt;
use std::sync::Arc;

use bevy::ecs::component::Component;
use bevy::log::{debug, trace, warn};
use bevy::math::Vec2;
use itertools::Itertools;
use ndarray::{Array1, ArrayView1};

use super::types::{BucketWrite, Projection, WriteRecorder};
use crate::physics::util::fastmath::FastMath;

/// What a freshly built buffer holds in every bucket: no occluder yet
pub const NO_OCCLUDER: f32 = f32::MAX;

/// Raised by [`LBufferBuilder::build`] when the configuration can not describe a buffer
#[derive(Debug, Clone, PartialEq)]
pub enum BufferConfigError {
    /// A buffer needs at least one bucket
    ZeroBuckets,
    /// The domain extent must be positive and finite
    NonPositiveExtent(f32),
    /// The ray radius must be positive and finite
    NonPositiveRayRadius(f32),
    /// The named epsilon must be zero or positive
    NegativeEpsilon(&'static str, f32),
}

impl fmt::Display for BufferConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BufferConfigError::ZeroBuckets => write!(f, "a light buffer needs at least one bucket"),
            BufferConfigError::NonPositiveExtent(extent) => {
                write!(f, "domain extent must be positive and finite, got {}", extent)
            }
            BufferConfigError::NonPositiveRayRadius(radius) => {
                write!(f, "ray radius must be positive and finite, got {}", radius)
            }
            BufferConfigError::NegativeEpsilon(name, value) => {
                write!(f, "{} must not be negative, got {}", name, value)
            }
        }
    }
}

impl Error for BufferConfigError {}

/// Defines when the user has simply asked for a bucket past the end of the buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketOutOfBoundsError {
    /// The requested bucket
    pub index: usize,
    /// How many buckets the buffer has
    pub bucket_count: usize,
}

impl fmt::Display for BucketOutOfBoundsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "bucket {} went outside the constraints of a {} bucket buffer",
            self.index, self.bucket_count
        )
    }
}

impl Error for BucketOutOfBoundsError {}

/// A 1-D visibility buffer for a light or viewer at the origin.
#[derive(Component, Clone)]
pub struct LBuffer {
    /// How many buckets the domain is split into
    bucket_count: usize,
    /// The span of the domain in caller units, one full turn for polar buffers
    domain_extent: f32,
    /// How buckets are laid out
    projection: Projection,
    /// Angles this close to zero or a full turn snap to zero, in radians
    angle_snap_epsilon: f32,
    /// How far each bucket ray searches for occluders
    ray_radius: f32,
    /// Rays and segments whose determinant is smaller than this are treated as parallel
    parallel_epsilon: f32,
    /// Extra buckets scanned past each end of a segment
    scan_margin: usize,
    /// Use the polynomial arc cosine when computing angles
    fast_trig: bool,
    /// Shared lookup tables
    math: Arc<FastMath>,
    /// The smallest distance seen per bucket
    values: Array1<f32>,
}

impl fmt::Debug for LBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LBuffer")
            .field("bucket_count", &self.bucket_count)
            .field("domain_extent", &self.domain_extent)
            .field("projection", &self.projection)
            .field("ray_radius", &self.ray_radius)
            .finish()
    }
}

/// A builder for LBuffer
pub struct LBufferBuilder {
    /// See [`LBufferBuilder::bucket_count`]
    bucket_count: usize,
    /// See [`LBufferBuilder::domain_extent`]
    domain_extent: f32,
    /// See [`LBufferBuilder::projection`]
    projection: Projection,
    /// See [`LBufferBuilder::angle_snap_epsilon`]
    angle_snap_epsilon: f32,
    /// See [`LBufferBuilder::ray_radius`]
    ray_radius: f32,
    /// See [`LBufferBuilder::parallel_epsilon`]
    parallel_epsilon: f32,
    /// See [`LBufferBuilder::scan_margin`]
    scan_margin: usize,
    /// See [`LBufferBuilder::fast_trig`]
    fast_trig: bool,
}

impl Default for LBufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LBufferBuilder {
    /// Start here
    pub fn new() -> Self {
        Self {
            bucket_count: 16,
            domain_extent: 1.0,
            projection: Projection::Polar,
            angle_snap_epsilon: 1e-4,
            ray_radius: 1.0e4,
            parallel_epsilon: 1e-6,
            scan_margin: 1,
            fast_trig: false,
        }
    }
    /// The number of buckets in the buffer
    pub fn bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }
    /// The span the buckets cover in caller units.
    /// For a polar buffer this is what one full turn is called, 1.0 by default.
    pub fn domain_extent(mut self, domain_extent: f32) -> Self {
        self.domain_extent = domain_extent;
        self
    }
    /// Polar or linear bucket layout
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
    /// Angles within this many radians of the positive x axis snap onto it,
    /// so points sitting on the axis don't flicker between the first and last bucket.
    pub fn angle_snap_epsilon(mut self, angle_snap_epsilon: f32) -> Self {
        self.angle_snap_epsilon = angle_snap_epsilon;
        self
    }
    /// The furthest distance a bucket ray looks for occluders
    pub fn ray_radius(mut self, ray_radius: f32) -> Self {
        self.ray_radius = ray_radius;
        self
    }
    /// The smallest ray/segment determinant that still counts as an intersection
    pub fn parallel_epsilon(mut self, parallel_epsilon: f32) -> Self {
        self.parallel_epsilon = parallel_epsilon;
        self
    }
    /// The number of extra buckets tested on each side of a segment's rounded span.
    /// Catches intersections lost to discretization right at the segment ends.
    pub fn scan_margin(mut self, scan_margin: usize) -> Self {
        self.scan_margin = scan_margin;
        self
    }
    /// Trade some angle precision for speed
    pub fn fast_trig(mut self, fast_trig: bool) -> Self {
        self.fast_trig = fast_trig;
        self
    }

    /// Validates the parameters and allocates the buffer, filled with [`NO_OCCLUDER`]
    pub fn build(self, math: Arc<FastMath>) -> Result<LBuffer, BufferConfigError> {
        if self.bucket_count == 0 {
            return Err(BufferConfigError::ZeroBuckets);
        }
        if self.domain_extent <= 0.0 || !self.domain_extent.is_finite() {
            return Err(BufferConfigError::NonPositiveExtent(self.domain_extent));
        }
        if self.ray_radius <= 0.0 || !self.ray_radius.is_finite() {
            return Err(BufferConfigError::NonPositiveRayRadius(self.ray_radius));
        }
        if self.angle_snap_epsilon < 0.0 || self.angle_snap_epsilon.is_nan() {
            return Err(BufferConfigError::NegativeEpsilon(
                "angle_snap_epsilon",
                self.angle_snap_epsilon,
            ));
        }
        if self.parallel_epsilon < 0.0 || self.parallel_epsilon.is_nan() {
            return Err(BufferConfigError::NegativeEpsilon(
                "parallel_epsilon",
                self.parallel_epsilon,
            ));
        }
        Ok(LBuffer {
            bucket_count: self.bucket_count,
            domain_extent: self.domain_extent,
            projection: self.projection,
            angle_snap_epsilon: self.angle_snap_epsilon,
            ray_radius: self.ray_radius,
            parallel_epsilon: self.parallel_epsilon,
            scan_margin: self.scan_margin,
            fast_trig: self.fast_trig,
            math,
            values: Array1::from_elem(self.bucket_count, NO_OCCLUDER),
        })
    }
}

/* ======================================
 * Simple Getters
 * ====================================== */
impl LBuffer {
    /// The number of buckets
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }
    /// The span of the domain in caller units
    pub fn domain_extent(&self) -> f32 {
        self.domain_extent
    }
    /// The bucket layout
    pub fn projection(&self) -> Projection {
        self.projection
    }
    /// How much of the domain one bucket covers
    pub fn bucket_width(&self) -> f32 {
        self.domain_extent / self.bucket_count as f32
    }
    /// All bucket values, in bucket order
    pub fn values(&self) -> ArrayView1<f32> {
        self.values.view()
    }
    /// The value of one bucket, or an error if the bucket does not exist
    pub fn checked_value(&self, index: usize) -> Result<f32, BucketOutOfBoundsError> {
        self.values
            .get(index)
            .copied()
            .ok_or(BucketOutOfBoundsError {
                index,
                bucket_count: self.bucket_count,
            })
    }
}

/* ======================================
 * Coordinate Mapping
 * ====================================== */
impl LBuffer {
    /// Domain units to continuous bucket coordinates
    pub fn float_to_bucket(&self, value: f32) -> f32 {
        value * self.bucket_count as f32 / self.domain_extent
    }
    /// Continuous bucket coordinates to domain units
    pub fn bucket_to_float(&self, bucket: f32) -> f32 {
        bucket * self.domain_extent / self.bucket_count as f32
    }
    /// The last bucket whose centre is at or below `value`.
    /// This is `floor(value - 0.5)`, so anything in the first half of bucket 0 gives -1.
    pub fn round_to_bucket(value: f32) -> isize {
        (value - 0.5).floor() as isize
    }

    /// Looks up the bucket covering `x` in domain units.
    /// Anything outside [0, domain_extent] reads as 0.
    pub fn get_value(&self, x: f32) -> f32 {
        if !(0.0..=self.domain_extent).contains(&x) {
            return 0.0;
        }
        let idx = (self.float_to_bucket(x).floor() as usize).min(self.bucket_count - 1);
        self.values[idx]
    }

    /// The bucket coordinate of a point's direction from the origin, in [0, bucket_count).
    /// Counter clockwise from the positive x axis. The origin itself has no direction.
    pub fn angle_of(&self, point: Vec2) -> Option<f32> {
        let radians = self.polar_angle(point)?;
        Some(radians / TAU * self.bucket_count as f32)
    }

    /// The angle of a point around the origin in [0, 2π)
    fn polar_angle(&self, point: Vec2) -> Option<f32> {
        if !point.is_finite() {
            return None;
        }
        // Right on the axis, no trig needed
        if point.y.abs() <= self.angle_snap_epsilon * point.x.abs() {
            return if point.x > 0.0 {
                Some(0.0)
            } else if point.x < 0.0 {
                Some(PI)
            } else {
                None
            };
        }
        // Scaled so the squared length can not overflow
        let scale = point.x.abs().max(point.y.abs());
        let (unit, _) = self.math.normalize(-point / scale)?;
        let cos = unit.dot(Vec2::X);
        let mut angle = if self.fast_trig {
            self.math.acos16(cos)
        } else {
            self.math.acos(cos)
        };
        if unit.y < 0.0 {
            angle = TAU - angle;
        }
        angle += PI;
        if angle >= TAU {
            angle -= TAU;
        }
        if angle < self.angle_snap_epsilon || angle > TAU - self.angle_snap_epsilon {
            angle = 0.0;
        }
        Some(angle)
    }

    /// Where a point lands in bucket coordinates under this buffer's projection
    pub fn bucket_coordinate(&self, point: Vec2) -> Option<f32> {
        match self.projection {
            Projection::Polar => self.angle_of(point),
            Projection::Linear if point.is_finite() => Some(self.float_to_bucket(point.x)),
            Projection::Linear => None,
        }
    }

    /// The value a point would write if it were the occluder
    fn distance_of(&self, point: Vec2) -> f32 {
        match self.projection {
            Projection::Polar => point.length(),
            Projection::Linear => point.y,
        }
    }

    /// The origin and unit direction of the ray through the centre of a bucket
    fn bucket_ray(&self, bucket: usize) -> (Vec2, Vec2) {
        let centre = bucket as f32 + 0.5;
        match self.projection {
            Projection::Polar => {
                let (sin, cos) = (centre / self.bucket_count as f32 * TAU).sin_cos();
                (Vec2::ZERO, Vec2::new(cos, sin))
            }
            Projection::Linear => (Vec2::new(self.bucket_to_float(centre), 0.0), Vec2::Y),
        }
    }

    /// Maps a signed bucket index back into the buffer.
    /// Polar buffers wrap around, linear buffers clamp.
    fn wrap_bucket(&self, bucket: isize) -> usize {
        let bucket_count = self.bucket_count as isize;
        match self.projection {
            Projection::Polar => bucket.rem_euclid(bucket_count) as usize,
            Projection::Linear => bucket.clamp(0, bucket_count - 1) as usize,
        }
    }
}

/* ======================================
 * Drawing
 * ====================================== */
impl LBuffer {
    /// Sets every bucket to `value`
    pub fn clear(&mut self, value: f32) {
        self.values.fill(value);
    }

    /// Write-min a single value into its bucket.
    /// Writes past the end of the buffer are a caller bug and get dropped.
    pub fn apply(&mut self, write: BucketWrite) {
        match self.values.get_mut(write.index) {
            Some(cell) => {
                if write.value < *cell {
                    *cell = write.value;
                }
            }
            None => warn!(
                "Dropping write to bucket {} of a {} bucket light buffer",
                write.index, self.bucket_count
            ),
        }
    }

    /// Apply a candidate and let the recorder know about it
    fn write<R>(&mut self, index: usize, value: f32, recorder: &mut R)
    where
        R: WriteRecorder + ?Sized,
    {
        if !value.is_finite() {
            return;
        }
        let write = BucketWrite {
            index,
            value: value.max(0.0),
        };
        self.apply(write);
        recorder.record_write(write);
    }

    /// Draws an occluding segment without recording it
    pub fn draw_line(&mut self, begin: Vec2, end: Vec2) {
        self.draw_line_recorded(begin, end, &mut ());
    }

    /// Draws an occluding segment, handing every write to `recorder` as well.
    ///
    /// Every bucket in the segment's span gets a ray through its centre, and where that
    /// ray crosses the segment within the ray radius, the distance along the ray is
    /// write-min'd into the bucket. A segment too short to span a bucket centre writes
    /// its nearer endpoint into the one bucket it falls in.
    pub fn draw_line_recorded<R>(&mut self, begin: Vec2, end: Vec2, recorder: &mut R)
    where
        R: WriteRecorder + ?Sized,
    {
        let (Some(begin_coord), Some(end_coord)) =
            (self.bucket_coordinate(begin), self.bucket_coordinate(end))
        else {
            trace!("Skipping segment {} -> {} with no projection", begin, end);
            return;
        };
        let (low, high) = if begin_coord <= end_coord {
            (begin_coord, end_coord)
        } else {
            (end_coord, begin_coord)
        };
        let bucket_count = self.bucket_count as f32;

        // Seen from the origin a segment covers less than half a turn,
        // so a wider span means it crosses the seam at angle 0
        let (start, stop) = match self.projection {
            Projection::Polar if high - low > bucket_count * 0.5 => (high, low + bucket_count),
            _ => (low, high),
        };
        let (start, stop) = match self.projection {
            Projection::Linear if stop < 0.0 || start > bucket_count => return,
            // Far endpoints would saturate the rounding, the scan is clamped to the buffer anyway
            Projection::Linear => (start.max(-1.0), stop.min(bucket_count + 1.0)),
            Projection::Polar => (start, stop),
        };
        let first = Self::round_to_bucket(start);
        let last = Self::round_to_bucket(stop);

        if first == last {
            // Coordinates below the first centre round to -1 but still lie in bucket 0
            let distance = self.distance_of(begin).min(self.distance_of(end));
            let index = first.clamp(0, self.bucket_count as isize - 1) as usize;
            self.write(index, distance, recorder);
            return;
        }

        let margin = self.scan_margin as isize;
        let mut scan_first = first - margin;
        let mut scan_last = last + margin;
        if self.projection == Projection::Linear {
            scan_first = scan_first.max(0);
            scan_last = scan_last.min(self.bucket_count as isize - 1);
        }
        let scan_len = ((scan_last - scan_first + 1).max(0) as usize).min(self.bucket_count);
        for offset in 0..scan_len {
            let index = self.wrap_bucket(scan_first + offset as isize);
            let (origin, direction) = self.bucket_ray(index);
            if let Some(distance) = self.intersect(origin, direction, begin, end) {
                self.write(index, distance, recorder);
            }
        }
    }

    /// Distance along a ray to where it crosses the segment, if it does so within the ray radius
    fn intersect(&self, origin: Vec2, direction: Vec2, begin: Vec2, end: Vec2) -> Option<f32> {
        // Measured from the nearer end so a huge far end can't overflow the products
        let (begin, end) = if (begin - origin).length_squared() > (end - origin).length_squared() {
            (end, begin)
        } else {
            (begin, end)
        };
        let edge = end - begin;
        let det = direction.perp_dot(edge);
        if det.abs() < self.parallel_epsilon {
            return None;
        }
        let offset = begin - origin;
        let along_ray = offset.perp_dot(edge) / det;
        let along_segment = offset.perp_dot(direction) / det;
        if !(0.0..=self.ray_radius).contains(&along_ray) || !(0.0..=1.0).contains(&along_segment) {
            return None;
        }
        Some(along_ray)
    }

    /// Draws without recording, see [`LBuffer::draw_span_recorded`]
    pub fn draw_span(&mut self, begin: Vec2, end: Vec2) {
        self.draw_span_recorded(begin, end, &mut ());
    }

    /// The old cheap way of drawing: x is a domain coordinate and y the value to write.
    /// Values are linearly interpolated across the rounded bucket span and clamped at 0.
    /// Only good for occluders that stay close to linear in bucket space.
    pub fn draw_span_recorded<R>(&mut self, begin: Vec2, end: Vec2, recorder: &mut R)
    where
        R: WriteRecorder + ?Sized,
    {
        if !begin.is_finite() || !end.is_finite() {
            return;
        }
        let (begin, end) = if begin.x > end.x {
            (end, begin)
        } else {
            (begin, end)
        };
        let last_bucket = self.bucket_count as isize - 1;
        let first = Self::round_to_bucket(self.float_to_bucket(begin.x));
        let last = Self::round_to_bucket(self.float_to_bucket(end.x));
        if last < 0 || first > last_bucket {
            return;
        }
        let first = first.max(0);
        let last = last.min(last_bucket);

        if first == last {
            self.write(first as usize, begin.y, recorder);
            return;
        }
        let span = (last - first) as f32;
        for x in first..=last {
            let t = (x - first) as f32 / span;
            let value = begin.y + (end.y - begin.y) * t;
            self.write(x as usize, value, recorder);
        }
    }
}

/* ======================================
 * Diagnostics
 * ====================================== */
impl LBuffer {
    /// Human readable listing of every bucket
    pub fn dump(&self) -> String {
        format!(
            "LBuffer size[{}]:\n{}",
            self.bucket_count,
            self.values
                .iter()
                .enumerate()
                .map(|(i, value)| format!("[{}] {:.3}", i, value))
                .join("\n")
        )
    }

    /// Writes [`LBuffer::dump`] to the debug log
    pub fn log_dump(&self) {
        debug!("{}", self.dump());
    }
}
