//! Spatial synthesis: spread one scalar over polygons.
//!
//! Output is a plausible-looking distribution for display, not an
//! authoritative disaggregation of the source value.

pub mod apportion;
pub mod hexgrid;
pub mod synthesizer;

pub use synthesizer::{
    GridScale, SpatialSynthesizer, Synthesis, SynthesisError, SynthesisMethod, SynthesisRequest,
};
