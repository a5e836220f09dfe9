// Infographic compositing: box geometry, text measurement, auto-fit, painting.
// Painting is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod fit;
pub mod font_metrics;
pub mod geometry;
pub mod painter;

// Re-export the public API consumed by the handlers.
pub use fit::{fit_text, FittedText};
pub use font_metrics::Typesetter;
pub use geometry::{CanvasSize, NormalizedBox};
pub use painter::{paint_layout, ContentItem, ContentQueues, PaintError};
