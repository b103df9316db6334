//! Chit draw demo entry point
//!
//! Native builds run the engine headless against recording handles and log
//! the phase traffic. Web hosts embed the library instead, attach DOM
//! handles (see `platform::dom`) and call `tick` from their frame loop.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use chit_draw::SessionState;
    use chit_draw::Timings;
    use chit_draw::consts::TICK_DT;
    use chit_draw::draw::{DrawEvent, DrawState, Participant, set_roster, tick};
    use chit_draw::surface::{Bounds, HandleSet, RecordingHandle};

    env_logger::init();
    log::info!("chit-draw (native) starting...");

    let timings = Timings::load();
    if let Ok(json) = serde_json::to_string(&timings) {
        log::debug!("timing profile: {json}");
    }

    let names = ["Amal", "Bhagya", "Chamara"];
    let mut state = DrawState::new(timings);
    let mut surface: HandleSet<RecordingHandle> = HandleSet::new();
    set_roster(
        &mut state,
        &mut surface,
        names.map(Participant::new).to_vec(),
    );
    for i in 0..names.len() {
        surface.attach_chit(
            i,
            RecordingHandle::with_bounds(Bounds::new(60.0 + 48.0 * i as f32, 320.0, 36.0, 52.0)),
        );
    }
    surface.bowl = Some(RecordingHandle::default());
    surface.scene = Some(RecordingHandle::with_bounds(Bounds::new(
        0.0, 0.0, 480.0, 640.0,
    )));
    surface.cursor = Some(RecordingHandle::default());

    state.begin_session();

    let mut cycles = 0u32;
    while cycles < 2 {
        tick(&mut state, &mut surface, TICK_DT);
        for event in state.drain_events() {
            match event {
                DrawEvent::WinnerChosen { chit } => {
                    println!(
                        "cycle {}: chit {chit} wins ({})",
                        cycles + 1,
                        state.winner_label().unwrap_or("?")
                    );
                }
                DrawEvent::SessionCompleted | DrawEvent::SessionAborted => cycles += 1,
                other => log::debug!("{other:?}"),
            }
        }
    }

    state.request_shutdown();
    while state.session != SessionState::Stopped {
        tick(&mut state, &mut surface, TICK_DT);
        state.drain_events();
    }
    println!("draw loop stopped after {:.1}s of animation", state.time);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM hosts embed the library; there is no binary entry point
}
