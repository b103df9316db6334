//! Platform glue between the engine and a concrete render surface
//!
//! Handles browser/native differences:
//! - On wasm32, [`dom::DomHandle`] drives real DOM elements (style writes,
//!   class toggles, bounding-rect measurement)
//! - Native builds bring their own `Drawable`; the recording double in
//!   `surface` covers headless runs and tests

#[cfg(target_arch = "wasm32")]
pub mod dom;

#[cfg(target_arch = "wasm32")]
pub use dom::DomHandle;
