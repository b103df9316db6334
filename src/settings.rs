//! Draw timing profile
//!
//! Every hold and transition duration the phase machine uses, in seconds.
//! Hosts can persist an adjusted profile (slower draws for accessibility,
//! faster ones for demo reels) separately from any other app state.

use serde::{Deserialize, Serialize};

/// Timing profile for one draw cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    // === Drop ===
    /// Hold after the layout flush before the settle sweep starts.
    pub drop_flush_hold: f32,
    /// Per-index stagger between chit settle starts.
    pub drop_stagger: f32,
    /// Settle transition duration.
    pub drop_settle: f32,
    /// Fade-in duration (runs alongside the settle).
    pub drop_fade: f32,
    /// Pause after the last settle finishes.
    pub drop_hold: f32,

    // === Stir ===
    /// Number of stir bursts per cycle.
    pub stir_repetitions: u8,
    /// Time between bursts.
    pub stir_cadence: f32,
    /// Transition duration for each burst's pose writes.
    pub stir_transition: f32,
    /// Pause after the last burst before selection.
    pub stir_hold: f32,

    // === Present ===
    /// Cursor hover above the grab point.
    pub hover_hold: f32,
    /// Cursor resting on the grab point.
    pub touch_hold: f32,
    /// Winner lift transition (and the hold that covers it).
    pub lift: f32,

    // === Reveal / Unreveal ===
    /// Delay between mounting the panel and unfolding it.
    pub reveal_delay: f32,
    /// How long the name stays on display.
    pub reveal_hold: f32,
    /// Panel fold-away duration.
    pub unreveal_fold: f32,
    /// Winner's ease back to neutral.
    pub unreveal_restore: f32,

    // === Vanish ===
    /// Pause after the scatter before the fade.
    pub vanish_lead: f32,
    /// Fade-out transition duration.
    pub vanish_fade: f32,
    /// Hold that covers the fade before the loop restarts.
    pub vanish_tail: f32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            drop_flush_hold: 0.1,
            drop_stagger: 0.15,
            drop_settle: 0.9,
            drop_fade: 0.3,
            drop_hold: 0.5,

            stir_repetitions: 5,
            stir_cadence: 0.35,
            stir_transition: 0.4,
            stir_hold: 0.5,

            hover_hold: 0.8,
            touch_hold: 0.4,
            lift: 1.2,

            reveal_delay: 0.1,
            reveal_hold: 3.5,
            unreveal_fold: 0.6,
            unreveal_restore: 0.8,

            vanish_lead: 1.0,
            vanish_fade: 0.5,
            vanish_tail: 0.6,
        }
    }
}

impl Timings {
    /// Total time from the layout flush until the last chit's settle
    /// transition ends.
    pub fn settle_span(&self, chit_count: usize) -> f32 {
        if chit_count == 0 {
            0.0
        } else {
            (chit_count - 1) as f32 * self.drop_stagger + self.drop_settle
        }
    }

    /// Uniformly scaled copy: every duration multiplied by `factor`,
    /// repetition counts untouched. A factor below 1 speeds the draw up.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            drop_flush_hold: self.drop_flush_hold * factor,
            drop_stagger: self.drop_stagger * factor,
            drop_settle: self.drop_settle * factor,
            drop_fade: self.drop_fade * factor,
            drop_hold: self.drop_hold * factor,
            stir_repetitions: self.stir_repetitions,
            stir_cadence: self.stir_cadence * factor,
            stir_transition: self.stir_transition * factor,
            stir_hold: self.stir_hold * factor,
            hover_hold: self.hover_hold * factor,
            touch_hold: self.touch_hold * factor,
            lift: self.lift * factor,
            reveal_delay: self.reveal_delay * factor,
            reveal_hold: self.reveal_hold * factor,
            unreveal_fold: self.unreveal_fold * factor,
            unreveal_restore: self.unreveal_restore * factor,
            vanish_lead: self.vanish_lead * factor,
            vanish_fade: self.vanish_fade * factor,
            vanish_tail: self.vanish_tail * factor,
        }
    }

    /// A profile is usable when every duration is finite and non-negative.
    pub fn validate(&self) -> bool {
        [
            self.drop_flush_hold,
            self.drop_stagger,
            self.drop_settle,
            self.drop_fade,
            self.drop_hold,
            self.stir_cadence,
            self.stir_transition,
            self.stir_hold,
            self.hover_hold,
            self.touch_hold,
            self.lift,
            self.reveal_delay,
            self.reveal_hold,
            self.unreveal_fold,
            self.unreveal_restore,
            self.vanish_lead,
            self.vanish_fade,
            self.vanish_tail,
        ]
        .iter()
        .all(|d| d.is_finite() && *d >= 0.0)
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "chit_draw_timings";

    /// Load the profile from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(timings) = serde_json::from_str::<Timings>(&json) {
                    if timings.validate() {
                        log::info!("Loaded timing profile from LocalStorage");
                        return timings;
                    }
                    log::warn!("Stored timing profile is invalid; using defaults");
                }
            }
        }

        log::info!("Using default timing profile");
        Self::default()
    }

    /// Save the profile to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Timing profile saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
