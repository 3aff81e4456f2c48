//! City map poster rendering.
//!
//! Composes fetched OpenStreetMap layers into a themed poster:
//! - Projection into the center's UTM zone and aspect-ratio cropping
//! - Layered drawing in fixed z-order (sea, land, landuse, water, parks,
//!   roads, railways, fades, labels)
//! - SVG output, PNG rasterization with density metadata, and PDF
//! - Batch generation on a bounded worker pool

pub mod batch;
pub mod canvas;
pub mod compositor;
pub mod crop;
pub mod gradient;
pub mod layers;
pub mod output;
pub mod png;
pub mod style;
pub mod typography;

pub use batch::{BatchJob, BatchRunner, BatchSummary, CancelToken, JobOutcome};
pub use canvas::Canvas;
pub use compositor::{compose, land_fill, LandFill, PosterCompositor, PosterData};
pub use crop::CropLimits;
pub use output::{write_artifact, FontContext};
pub use style::RoadClass;
