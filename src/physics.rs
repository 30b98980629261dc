//! This module contains all the physics related code.
//!
//! When contributing to this module, please keep the following things in mind:
//! * Keep it as "game engine agnostic" as possible. Bevy is used for math types,
//!   logging and the plugin glue, the buffers themselves don't need a running app.
//! * Physics should be highly unit tested.

use bevy::app::{PluginGroup, PluginGroupBuilder};

use self::light::LightBufferPlugin;

pub mod light;
pub mod util;

pub struct PhysicsPluginGroup;

impl PluginGroup for PhysicsPluginGroup {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>().add(LightBufferPlugin)
    }
}
