use crate::config::*;

/// How the border of a block is drawn.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Outline {
    /// The block is part of the selection.
    Selected,
    /// Regular border for populated blocks.
    Plain,
    /// No border.
    Hidden,
}

/// The party that a block leans toward.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Lean {
    Dem,
    Rep,
    /// No voting-age population.
    Empty,
}

#[derive(PartialEq, Debug, Clone)]
pub struct BlockStyle {
    pub lean: Lean,
    pub fill_color: Color,
    /// Always within [min_opacity, 1].
    pub fill_opacity: f64,
    pub outline: Outline,
    pub stroke_weight: u32,
}

/// What the style derivation needs to know about one block.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct StyleInput<'a> {
    pub over18: u64,
    pub stats: &'a BlockStats,
    pub selected: bool,
}

pub fn lean(over18: u64, stats: &BlockStats) -> Lean {
    if over18 == 0 {
        Lean::Empty
    } else if stats.dem_share < 0.5 {
        Lean::Rep
    } else {
        Lean::Dem
    }
}

// NaN falls back to the floor.
fn bounded_opacity(raw: f64, min_opacity: f64) -> f64 {
    raw.max(min_opacity).min(1.0)
}

fn ratio(count: f64, max: f64) -> f64 {
    if max > 0.0 {
        count / max
    } else {
        0.0
    }
}

/// Derives the display style of a block from its statistics and the totals
/// of the session. This does not modify anything.
pub fn derive_style(block: &StyleInput, totals: &SessionTotals, rules: &StyleRules) -> BlockStyle {
    let lean = lean(block.over18, block.stats);
    let raw_opacity = match (lean, rules.opacity_mode) {
        (Lean::Empty, _) => 0.0,
        (Lean::Dem, OpacityMode::Share) => block.stats.dem_share,
        (Lean::Rep, OpacityMode::Share) => 1.0 - block.stats.dem_share,
        (Lean::Dem, OpacityMode::Count) => ratio(block.stats.dem_votes, totals.max_dem_voters),
        (Lean::Rep, OpacityMode::Count) => ratio(block.stats.rep_votes, totals.max_rep_voters),
    };
    let fill_color = match lean {
        Lean::Dem => rules.dem_color.clone(),
        Lean::Rep => rules.rep_color.clone(),
        Lean::Empty => rules.neutral_color.clone(),
    };
    let outline = if block.selected {
        Outline::Selected
    } else if block.over18 > 0 {
        Outline::Plain
    } else {
        Outline::Hidden
    };
    BlockStyle {
        lean,
        fill_color,
        fill_opacity: bounded_opacity(raw_opacity, rules.min_opacity),
        outline,
        stroke_weight: rules.stroke_weight,
    }
}
