//! Chit Draw - a looping savings-circle draw animation engine
//!
//! Core modules:
//! - `draw`: Host-clocked phase machine (state, geometry, tick)
//! - `surface`: Render-surface abstraction and recording test double
//! - `platform`: Browser surface glue (DOM handles on wasm32)
//! - `settings`: Data-driven timing profile

pub mod draw;
pub mod platform;
pub mod settings;
pub mod surface;

pub use draw::{DrawEvent, DrawState, Participant, PhaseKind, SessionState};
pub use settings::Timings;
pub use surface::{Bounds, Drawable, HandleSet, Pose, Transition, VisualFlag};

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    /// Fixed timestep for hosts driving the engine at 60 Hz
    pub const TICK_DT: f32 = 1.0 / 60.0;
    /// Maximum catch-up ticks per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Convert cartesian (x, y) to polar (r, theta)
#[inline]
pub fn cartesian_to_polar(pos: Vec2) -> (f32, f32) {
    (pos.length(), pos.y.atan2(pos.x))
}
