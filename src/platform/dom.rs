//! DOM-backed render handles (WASM only)
//!
//! Each [`DomHandle`] wraps one `HtmlElement` and maps the engine's surface
//! writes onto inline styles and class toggles: poses become `transform`
//! strings, transitions become `transition` declarations, flags become CSS
//! classes the stylesheet keys off. Bounds come from
//! `getBoundingClientRect`, and a layout flush is an `offsetHeight` read.

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::surface::{Bounds, Drawable, Pose, Transition, VisualFlag};

/// One DOM element the engine may write to.
#[derive(Debug, Clone)]
pub struct DomHandle {
    element: HtmlElement,
}

impl DomHandle {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }

    /// Look an element up by id. Returns `None` when the element isn't in
    /// the document (yet); the engine treats the absent slot as a no-op.
    pub fn by_id(document: &Document, id: &str) -> Option<Self> {
        document
            .get_element_by_id(id)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
            .map(Self::new)
    }

    fn set_style(&self, property: &str, value: &str) {
        let _ = self.element.style().set_property(property, value);
    }

    fn class_name(flag: VisualFlag) -> &'static str {
        match flag {
            VisualFlag::Revealing => "revealing",
            VisualFlag::PanelVisible => "panel-visible",
            VisualFlag::PanelUnfolding => "unfolding",
            VisualFlag::Elevated => "elevated",
            VisualFlag::Visible => "visible",
        }
    }
}

impl Drawable for DomHandle {
    fn set_pose(&mut self, pose: Pose) {
        let transform = format!(
            "translate({}px, {}px) translateZ({}px) rotate({}deg) rotateX({}deg) scale({})",
            pose.translation.x, pose.translation.y, pose.depth, pose.rotation, pose.tilt, pose.scale
        );
        self.set_style("transform", &transform);
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.set_style("opacity", &opacity.to_string());
    }

    fn set_transition(&mut self, transition: Transition) {
        if transition == Transition::NONE {
            self.set_style("transition", "none");
        } else {
            let declaration = format!(
                "transform {}s ease, opacity {}s ease",
                transition.pose, transition.opacity
            );
            self.set_style("transition", &declaration);
        }
    }

    fn set_flag(&mut self, flag: VisualFlag, on: bool) {
        let _ = self
            .element
            .class_list()
            .toggle_with_force(Self::class_name(flag), on);
    }

    fn measure_bounds(&self) -> Option<Bounds> {
        let rect = self.element.get_bounding_client_rect();
        Some(Bounds::new(
            rect.x() as f32,
            rect.y() as f32,
            rect.width() as f32,
            rect.height() as f32,
        ))
    }

    fn flush_layout(&mut self) {
        // Reading offsetHeight forces a synchronous layout pass
        let _ = self.element.offset_height();
    }
}

/// One-time console logging setup for web hosts.
pub fn init_console_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}
