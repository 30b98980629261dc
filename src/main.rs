//! Draws a handful of occluders into a light buffer for a few frames and logs the result.
//! The occluder sits still for two frames and then moves, so the log shows both cache
//! hits and misses.

use std::sync::Arc;

use bevy::app::{App, Update};
use bevy::ecs::component::Component;
use bevy::ecs::entity::Entity;
use bevy::ecs::schedule::IntoSystemConfigs;
use bevy::ecs::system::{Local, Query};
use bevy::log::{error, info, LogPlugin};
use bevy::math::Vec2;

use lbuffer::physics::light::buffer::{LBuffer, LBufferBuilder};
use lbuffer::physics::light::cache::LBufferCache;
use lbuffer::physics::light::types::ProjectedObject;
use lbuffer::physics::util::fastmath::FastMath;
use lbuffer::physics::PhysicsPluginGroup;

/// Frames to simulate
const FRAMES: usize = 3;

/// Something that casts a shadow, as segments relative to its position
#[derive(Component, Debug, Clone)]
struct Occluder {
    position: Vec2,
    size: Vec2,
    segments: Vec<(Vec2, Vec2)>,
}

impl ProjectedObject for Occluder {
    fn position(&self) -> Vec2 {
        self.position
    }
    fn size(&self) -> Vec2 {
        self.size
    }
}

/// Nudges every occluder once the cache has had a chance to warm up
fn move_occluders(mut frame: Local<usize>, mut occluders: Query<&mut Occluder>) {
    *frame += 1;
    if *frame == FRAMES {
        for mut occluder in occluders.iter_mut() {
            occluder.position.x += 0.5;
        }
    }
}

fn draw_occluders(
    mut lights: Query<(&mut LBuffer, &mut LBufferCache)>,
    occluders: Query<(Entity, &Occluder)>,
) {
    for (mut buffer, mut cache) in lights.iter_mut() {
        buffer.clear(1000.0);
        for (entity, occluder) in occluders.iter() {
            let status = cache.draw_object(entity, occluder, &mut *buffer, |buffer, entry| {
                for (begin, end) in &occluder.segments {
                    buffer.draw_line_recorded(
                        *begin + occluder.position,
                        *end + occluder.position,
                        entry,
                    );
                }
            });
            info!("{:?}: {:?}", entity, status);
        }
    }
}

fn log_buffers(lights: Query<&LBuffer>) {
    for buffer in lights.iter() {
        info!("value at 0.7: {}", buffer.get_value(0.7));
        info!("value at 0.3: {}", buffer.get_value(0.3));
    }
}

fn main() {
    let mut app = App::new();
    app.add_plugins((LogPlugin::default(), PhysicsPluginGroup))
        .add_systems(
            Update,
            (move_occluders, draw_occluders, log_buffers).chain(),
        );

    let math = Arc::new(FastMath::init());
    let buffer = match LBufferBuilder::new().bucket_count(16).build(math) {
        Ok(buffer) => buffer,
        Err(err) => {
            error!("Could not build the light buffer: {}", err);
            return;
        }
    };
    app.world.spawn((buffer, LBufferCache::<Entity>::default()));
    app.world.spawn(Occluder {
        position: Vec2::new(5.0, 3.0),
        size: Vec2::ZERO,
        segments: vec![
            (Vec2::new(15.0, 2.0), Vec2::new(20.0, 32.5)),
            (Vec2::new(-5.0, 7.0), Vec2::new(40.0, 45.0)),
            (Vec2::new(45.0, 17.0), Vec2::new(5.0, 50.0)),
            (Vec2::new(-5.0, 8.0), Vec2::new(5.0, 57.1)),
            (Vec2::new(50.0, 9.3), Vec2::new(10.0, 67.321)),
        ],
    });

    for _ in 0..FRAMES {
        app.update();
    }

    let mut lights = app.world.query::<&LBuffer>();
    for buffer in lights.iter(&app.world) {
        info!("{}", buffer.dump());
    }
}
