//! Domain types for fractallab

pub mod bar;
pub mod report;
pub mod signal;

pub use bar::{validate_series, BarError, PriceBar};
pub use report::{
    EdgeOutlook, InstrumentReport, LayerReport, LayerStatus, Layers, SigmaEdge, SigmaState,
};
pub use signal::{
    Bias, Cadence, ExtensionTarget, FractalSignal, Grade, PeriodKey, PriceRange, ResolutionTier,
    TargetKind, TargetStatus,
};
