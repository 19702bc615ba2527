pub const MIN_POSITION: f32 = 0.0;
pub const MAX_POSITION: f32 = 100.0;
pub const DEFAULT_POSITION: f32 = 50.0;

/// What the pointer was over when it went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Handle,
    /// Anywhere in the container other than the handle. Chat buttons only
    /// ever grab the handle.
    #[cfg_attr(not(test), allow(dead_code))]
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliderEvent {
    PointerDown { target: PointerTarget, x: f32 },
    PointerMove { x: f32 },
    PointerUp,
}

/// Horizontal extent of the comparison container, in the same units as
/// pointer coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerBounds {
    pub left: f32,
    pub width: f32,
}

impl ContainerBounds {
    pub fn new(left: f32, width: f32) -> Self {
        ContainerBounds { left, width }
    }

    fn position_for(&self, x: f32) -> Option<f32> {
        if !(self.width > 0.0) || !x.is_finite() {
            return None;
        }
        Some(clamp_position((x - self.left) / self.width * 100.0))
    }

    pub fn handle_x(&self, position: f32) -> f32 {
        self.left + self.width * clamp_position(position) / 100.0
    }
}

pub fn clamp_position(position: f32) -> f32 {
    if position.is_nan() {
        return DEFAULT_POSITION;
    }
    position.clamp(MIN_POSITION, MAX_POSITION)
}

/// Before/after divider state: a percentage of the container width and
/// whether the handle is currently being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonSlider {
    position: f32,
    dragging: bool,
}

impl Default for ComparisonSlider {
    fn default() -> Self {
        ComparisonSlider {
            position: DEFAULT_POSITION,
            dragging: false,
        }
    }
}

impl ComparisonSlider {
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn set_position(&mut self, position: f32) {
        self.position = clamp_position(position);
    }

    /// Applies one pointer event. Dragging starts only on the handle, ends
    /// on any pointer-up, and moves update the position immediately.
    pub fn handle_event(&mut self, event: SliderEvent, bounds: ContainerBounds) {
        match event {
            SliderEvent::PointerDown {
                target: PointerTarget::Handle,
                ..
            } => self.dragging = true,
            SliderEvent::PointerDown {
                target: PointerTarget::Image,
                ..
            } => {}
            SliderEvent::PointerMove { x } => {
                if !self.dragging {
                    return;
                }
                if let Some(position) = bounds.position_for(x) {
                    self.position = position;
                }
            }
            SliderEvent::PointerUp => self.dragging = false,
        }
    }

    /// Grabs the handle, moves it by `delta` percentage points and lets go.
    pub fn nudge(&mut self, delta: f32, bounds: ContainerBounds) {
        let start = bounds.handle_x(self.position);
        let target = start + bounds.width * delta / 100.0;
        self.handle_event(
            SliderEvent::PointerDown {
                target: PointerTarget::Handle,
                x: start,
            },
            bounds,
        );
        self.handle_event(SliderEvent::PointerMove { x: target }, bounds);
        self.handle_event(SliderEvent::PointerUp, bounds);
    }
}
