//! Remembers what each object drew into a light buffer last time,
//! so objects that haven't moved or changed size can replay their writes
//! instead of being rasterized again.
//!
//! Entries are keyed by a caller supplied handle and are never told when the
//! object behind the handle goes away. Instead every entry ages once per frame
//! through [`LBufferCache::update`] and is dropped once it goes unused for too long.

use std::fmt::Debug;
use std::hash::Hash;

use bevy::ecs::component::Component;
use bevy::ecs::entity::Entity;
use bevy::log::{debug, trace};
use bevy::math::Vec2;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

use super::buffer::LBuffer;
use super::types::{BucketWrite, ProjectedObject, WriteRecorder};

/// How many frames an entry survives without being used
pub const DEFAULT_MAX_AGE: u32 = 5;

/// The recorded draw of one object
#[derive(Debug, Clone, Default)]
pub struct LBufferCacheEntry {
    position: Vec2,
    size: Vec2,
    writes: Vec<BucketWrite>,
    age: u32,
}

impl LBufferCacheEntry {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            writes: Vec::new(),
            age: 0,
        }
    }

    /// Forget the old recording before drawing the object again
    pub fn reset(&mut self, position: Vec2, size: Vec2) {
        self.writes.clear();
        self.position = position;
        self.size = size;
        self.age = 0;
    }

    pub fn record(&mut self, index: usize, value: f32) {
        self.writes.push(BucketWrite { index, value });
    }

    /// Write-min every recorded write into `buffer`, in the order they were recorded
    pub fn replay(&self, buffer: &mut LBuffer) {
        for write in &self.writes {
            buffer.apply(*write);
        }
    }

    /// Whether this recording is still good for an object at `position` with `size`.
    /// A tolerance of 0 asks for exact equality.
    pub fn matches(&self, position: Vec2, size: Vec2, tolerance: f32) -> bool {
        self.position.abs_diff_eq(position, tolerance) && self.size.abs_diff_eq(size, tolerance)
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }
    pub fn size(&self) -> Vec2 {
        self.size
    }
    pub fn writes(&self) -> &[BucketWrite] {
        &self.writes
    }
    /// Frames since this entry was last used
    pub fn age(&self) -> u32 {
        self.age
    }
}

impl WriteRecorder for LBufferCacheEntry {
    fn record_write(&mut self, write: BucketWrite) {
        self.writes.push(write);
    }
}

/// What [`LBufferCache::check_cache`] found
#[derive(Debug)]
pub enum CacheLookup<'a> {
    /// The recording is valid, replay it
    Hit(&'a LBufferCacheEntry),
    /// New or stale, reset it and draw the object again
    Miss(&'a mut LBufferCacheEntry),
}

impl CacheLookup<'_> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// Whether a cached draw was replayed or redone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// Recorded draws of every object that casts into one light buffer.
///
/// Keys are plain handles, by default the bevy `Entity` of the object.
/// The cache only compares them and never reads what they refer to.
#[derive(Component, Debug, Clone)]
pub struct LBufferCache<K = Entity> {
    entries: HashMap<K, LBufferCacheEntry>,
    max_age: u32,
    tolerance: f32,
}

impl<K> Default for LBufferCache<K>
where
    K: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE)
    }
}

impl<K> LBufferCache<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Entries that go more than `max_age` updates without a hit or reset are dropped
    pub fn new(max_age: u32) -> Self {
        Self {
            entries: HashMap::new(),
            max_age,
            tolerance: 0.0,
        }
    }

    /// Let positions and sizes drift by up to `tolerance` before a recording counts as stale
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        debug_assert!(tolerance >= 0.0, "tolerance must not be negative");
        self.tolerance = tolerance;
        self
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn get(&self, key: &K) -> Option<&LBufferCacheEntry> {
        self.entries.get(key)
    }

    /// Looks up the recording for `key`.
    ///
    /// A matching recording is a hit and counts as a use. Otherwise the caller gets the
    /// entry to redraw into, either brand new or the stale one it replaces.
    pub fn check_cache(&mut self, key: K, position: Vec2, size: Vec2) -> CacheLookup<'_> {
        let tolerance = self.tolerance;
        match self.entries.entry(key) {
            Entry::Vacant(vacant) => {
                trace!("Light buffer cache miss for new object {:?}", key);
                CacheLookup::Miss(vacant.insert(LBufferCacheEntry::new(position, size)))
            }
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                if entry.matches(position, size, tolerance) {
                    trace!("Light buffer cache hit for {:?}", key);
                    entry.age = 0;
                    CacheLookup::Hit(entry)
                } else {
                    trace!(
                        "Light buffer cache entry for {:?} is stale, was at {} now at {}",
                        key,
                        entry.position,
                        position
                    );
                    CacheLookup::Miss(entry)
                }
            }
        }
    }

    /// [`LBufferCache::check_cache`] with the position and size read off the object
    pub fn check_object<O>(&mut self, key: K, object: &O) -> CacheLookup<'_>
    where
        O: ProjectedObject + ?Sized,
    {
        self.check_cache(key, object.position(), object.size())
    }

    /// Replays the recording for `key` into `buffer` if it is still valid.
    /// Otherwise resets the entry and calls `draw`, which should draw the object
    /// with the entry as the recorder.
    pub fn draw_cached<F>(
        &mut self,
        key: K,
        position: Vec2,
        size: Vec2,
        buffer: &mut LBuffer,
        draw: F,
    ) -> CacheStatus
    where
        F: FnOnce(&mut LBuffer, &mut LBufferCacheEntry),
    {
        match self.check_cache(key, position, size) {
            CacheLookup::Hit(entry) => {
                entry.replay(buffer);
                CacheStatus::Hit
            }
            CacheLookup::Miss(entry) => {
                entry.reset(position, size);
                draw(buffer, entry);
                CacheStatus::Miss
            }
        }
    }

    /// [`LBufferCache::draw_cached`] for a [`ProjectedObject`]
    pub fn draw_object<O, F>(
        &mut self,
        key: K,
        object: &O,
        buffer: &mut LBuffer,
        draw: F,
    ) -> CacheStatus
    where
        O: ProjectedObject + ?Sized,
        F: FnOnce(&mut LBuffer, &mut LBufferCacheEntry),
    {
        self.draw_cached(key, object.position(), object.size(), buffer, draw)
    }

    /// Call once per frame. Ages every entry and drops the ones nobody used for too long.
    pub fn update(&mut self) {
        let max_age = self.max_age;
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            entry.age += 1;
            entry.age <= max_age
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(
                "Evicted {} light buffer cache entries, {} left",
                evicted,
                self.entries.len()
            );
        }
    }
}
