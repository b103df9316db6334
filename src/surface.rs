//! Render-surface abstraction
//!
//! The engine never touches a concrete render surface. Everything it does to
//! the screen goes through the [`Drawable`] trait: pose and opacity writes,
//! transition timing, boolean channels, and bounds queries. Hosts supply one
//! implementation per surface kind (DOM elements on the web, a recording
//! double in tests) and the engine stays monomorphised over it.
//!
//! Every handle slot in a [`HandleSet`] tolerates being momentarily absent:
//! a write to an empty slot is silently skipped, never an error.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A composed visual pose for one surface element.
///
/// Translation is in surface units with y pointing down (screen convention);
/// `rotation` spins in-plane, `tilt` rocks out-of-plane, `depth` translates
/// along the view axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// In-plane translation.
    pub translation: Vec2,
    /// In-plane rotation (degrees).
    pub rotation: f32,
    /// Out-of-plane tilt rotation (degrees).
    pub tilt: f32,
    /// Translation along the view axis.
    pub depth: f32,
    /// Uniform scale.
    pub scale: f32,
}

impl Pose {
    /// Untransformed pose.
    pub const NEUTRAL: Self = Self {
        translation: Vec2::ZERO,
        rotation: 0.0,
        tilt: 0.0,
        depth: 0.0,
        scale: 1.0,
    };

    /// Neutral pose at the given translation.
    pub fn at(translation: Vec2) -> Self {
        Self {
            translation,
            ..Self::NEUTRAL
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Transition timing applied to subsequent pose/opacity writes, in seconds.
///
/// Pose and opacity animate independently (a settle can take 900 ms while
/// the fade-in takes 300 ms), so the two durations are carried separately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Duration for pose changes.
    pub pose: f32,
    /// Duration for opacity changes.
    pub opacity: f32,
}

impl Transition {
    /// Immediate application; cancels any transition in flight.
    pub const NONE: Self = Self {
        pose: 0.0,
        opacity: 0.0,
    };

    /// Same duration for pose and opacity.
    pub fn uniform(duration: f32) -> Self {
        Self {
            pose: duration,
            opacity: duration,
        }
    }

    /// Independent pose and opacity durations.
    pub fn split(pose: f32, opacity: f32) -> Self {
        Self { pose, opacity }
    }
}

impl Default for Transition {
    fn default() -> Self {
        Self::NONE
    }
}

/// Boolean channels a handle understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualFlag {
    /// This chit is the one currently being revealed.
    Revealing,
    /// The chit's unfold panel is mounted.
    PanelVisible,
    /// The unfold panel is in its unfolded pose.
    PanelUnfolding,
    /// Elevated stacking order while lifted out of the bowl.
    Elevated,
    /// Element visibility (used for the cursor).
    Visible,
}

/// Axis-aligned on-screen extent of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Top-left corner.
    pub origin: Vec2,
    /// Width and height.
    pub size: Vec2,
}

impl Bounds {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    /// Center point of the extent.
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }
}

/// One manipulable element of the render surface.
pub trait Drawable {
    /// Apply a composed pose.
    fn set_pose(&mut self, pose: Pose);

    /// Apply an opacity in [0, 1].
    fn set_opacity(&mut self, opacity: f32);

    /// Set the transition timing for subsequent pose/opacity writes.
    fn set_transition(&mut self, transition: Transition);

    /// Toggle a boolean channel.
    fn set_flag(&mut self, flag: VisualFlag, on: bool);

    /// Current on-screen extent, if the element is laid out.
    fn measure_bounds(&self) -> Option<Bounds>;

    /// Force a synchronous layout pass. Only container handles care.
    fn flush_layout(&mut self) {}
}

/// The engine's view of the render surface: one bowl container, one scene
/// used for measurement, one cursor, and an index-addressed collection of
/// chit handles sized to the participant roster.
#[derive(Debug)]
pub struct HandleSet<D: Drawable> {
    /// Bowl container; receives layout flushes only.
    pub bowl: Option<D>,
    /// Measurement root; read for bounds, never written.
    pub scene: Option<D>,
    /// The picking-hand cursor.
    pub cursor: Option<D>,
    chits: Vec<Option<D>>,
}

impl<D: Drawable> HandleSet<D> {
    pub fn new() -> Self {
        Self {
            bowl: None,
            scene: None,
            cursor: None,
            chits: Vec::new(),
        }
    }

    /// Number of chit slots (attached or not).
    pub fn chit_count(&self) -> usize {
        self.chits.len()
    }

    /// Resize the chit collection to `count` slots. The first
    /// `min(old, count)` handles are reused; stale handles beyond the new
    /// count are dropped; new slots start absent.
    pub fn resize_chits(&mut self, count: usize) {
        self.chits.resize_with(count, || None);
    }

    /// Attach a handle at `index`. Returns `false` if the slot doesn't exist.
    pub fn attach_chit(&mut self, index: usize, handle: D) -> bool {
        match self.chits.get_mut(index) {
            Some(slot) => {
                *slot = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Detach and return the handle at `index`, if any.
    pub fn detach_chit(&mut self, index: usize) -> Option<D> {
        self.chits.get_mut(index).and_then(Option::take)
    }

    pub fn chit(&self, index: usize) -> Option<&D> {
        self.chits.get(index).and_then(Option::as_ref)
    }

    pub fn chit_mut(&mut self, index: usize) -> Option<&mut D> {
        self.chits.get_mut(index).and_then(Option::as_mut)
    }

    /// Indices of slots with an attached handle, in index order.
    pub fn present_chits(&self) -> impl Iterator<Item = usize> + '_ {
        self.chits
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| i))
    }
}

impl<D: Drawable> Default for HandleSet<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// One write observed by a [`RecordingHandle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceOp {
    Pose(Pose),
    Opacity(f32),
    Transition(Transition),
    Flag(VisualFlag, bool),
    LayoutFlush,
}

/// Recording test double for [`Drawable`].
///
/// Stores every write in order and answers bounds queries with a
/// configurable rectangle. Used by the inline tests and the headless demo.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandle {
    pub ops: Vec<SurfaceOp>,
    pub bounds: Option<Bounds>,
}

impl RecordingHandle {
    pub fn with_bounds(bounds: Bounds) -> Self {
        Self {
            ops: Vec::new(),
            bounds: Some(bounds),
        }
    }

    /// Most recent pose write, if any.
    pub fn last_pose(&self) -> Option<Pose> {
        self.ops.iter().rev().find_map(|op| match op {
            SurfaceOp::Pose(pose) => Some(*pose),
            _ => None,
        })
    }

    /// Most recent opacity write, if any.
    pub fn last_opacity(&self) -> Option<f32> {
        self.ops.iter().rev().find_map(|op| match op {
            SurfaceOp::Opacity(opacity) => Some(*opacity),
            _ => None,
        })
    }

    /// Latest value written for `flag` (false if never written).
    pub fn flag(&self, flag: VisualFlag) -> bool {
        self.ops
            .iter()
            .rev()
            .find_map(|op| match op {
                SurfaceOp::Flag(f, on) if *f == flag => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl Drawable for RecordingHandle {
    fn set_pose(&mut self, pose: Pose) {
        self.ops.push(SurfaceOp::Pose(pose));
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.ops.push(SurfaceOp::Opacity(opacity));
    }

    fn set_transition(&mut self, transition: Transition) {
        self.ops.push(SurfaceOp::Transition(transition));
    }

    fn set_flag(&mut self, flag: VisualFlag, on: bool) {
        self.ops.push(SurfaceOp::Flag(flag, on));
    }

    fn measure_bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    fn flush_layout(&mut self) {
        self.ops.push(SurfaceOp::LayoutFlush);
    }
}
