pub mod render;
pub mod slider;

pub use render::render_comparison_png;
pub use slider::{ComparisonSlider, ContainerBounds};
