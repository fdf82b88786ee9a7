//! Bias classification: where did the reference window close inside its range?

use crate::config::TieBreak;
use crate::domain::{Bias, PriceRange};
use crate::window::Window;

/// Outcome of classifying one reference window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub bias: Bias,
    /// `None` when the range is degenerate.
    pub position: Option<f64>,
    pub range: PriceRange,
    pub close: f64,
}

/// Normalized location of `close` in `range`, or `None` for a zero-width
/// (or non-finite) range.
pub fn fractal_position(close: f64, range: PriceRange) -> Option<f64> {
    let width = range.width();
    if !(width.is_finite() && width > 0.0) {
        return None;
    }
    Some(((close - range.low) / width).clamp(0.0, 1.0))
}

/// Map a position to a bias. Below the midpoint is BEAR, above is BULL, and
/// an exact midpoint follows `tie_break`.
pub fn bias_for(position: f64, tie_break: TieBreak) -> Bias {
    if position < 0.5 {
        Bias::Bear
    } else if position > 0.5 {
        Bias::Bull
    } else {
        match tie_break {
            TieBreak::Undefined => Bias::Undefined,
            TieBreak::Bull => Bias::Bull,
            TieBreak::Bear => Bias::Bear,
        }
    }
}

pub fn classify(reference: &Window<'_>, tie_break: TieBreak) -> Classification {
    let range = reference.range();
    let close = reference.close_price();
    let position = fractal_position(close, range);
    let bias = position.map_or(Bias::Undefined, |p| bias_for(p, tie_break));
    Classification { bias, position, range, close }
}
