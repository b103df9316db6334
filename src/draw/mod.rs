//! Host-clocked draw choreography
//!
//! All engine logic lives here. This module must stay pure with respect to
//! the render surface:
//! - Surface writes go through `surface::Drawable` only
//! - Time comes from the host-driven `tick`
//! - Randomness comes from the RNG carried in `DrawState`
//! - No platform dependencies

pub mod geometry;
pub mod state;
pub mod tick;

pub use state::{
    ChitVisual, DrawEvent, DrawState, Participant, PhaseKind, SessionState, Step, UnfoldPanel,
};
pub use tick::{set_roster, tick};
