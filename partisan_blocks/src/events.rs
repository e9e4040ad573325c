use log::{debug, info, warn};

use crate::config::*;
use crate::report::BlockReport;
use crate::style::BlockStyle;
use crate::MapSession;

/// Everything that can happen to a map session.
///
/// Events are applied one at a time, in the order the driver receives them.
/// Fetch completions may arrive in any order relative to each other.
#[derive(PartialEq, Debug, Clone)]
pub enum SessionEvent {
    /// The user moved or zoomed the map.
    ViewportChanged(Bounds),
    /// The lookup service answered for the given bounds.
    FetchCompleted {
        bounds: Bounds,
        blocks: Vec<BlockDemographics>,
    },
    /// The lookup service could not be reached or sent garbage.
    FetchFailed { bounds: Bounds, reason: String },
    FeatureClicked(BlockId),
    FeatureHovered(BlockId),
    CoefficientsChanged(RegressionCoefficients),
    /// Throws away the whole session and loads the given viewport again.
    Reload(Bounds),
}

/// What the driver must do after an event has been applied.
#[derive(PartialEq, Debug, Clone)]
pub enum Effect {
    /// Query the lookup service for these bounds.
    Fetch(Bounds),
    /// Hand these newly loaded blocks to the renderer.
    AddFeatures(Vec<BlockId>),
    /// Remove every feature from the renderer.
    ClearFeatures,
    /// Restyle only these blocks.
    Restyle(Vec<BlockId>),
    /// Restyle every loaded block.
    RestyleAll,
    ShowReport(BlockReport),
}

/// Remembers the last viewport that was fetched, so that an unchanged
/// viewport does not trigger another fetch.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ViewportTracker {
    last_fetched: Option<Bounds>,
}

impl ViewportTracker {
    pub fn last_fetched(&self) -> Option<Bounds> {
        self.last_fetched
    }

    /// Returns true and records the bounds if they differ from the last fetch.
    pub fn should_fetch(&mut self, bounds: &Bounds) -> bool {
        if self.last_fetched.as_ref() == Some(bounds) {
            false
        } else {
            self.last_fetched = Some(*bounds);
            true
        }
    }

    /// Forgets a fetch that did not go through, so that the same viewport
    /// can be asked for again.
    pub fn forget(&mut self, bounds: &Bounds) {
        if self.last_fetched.as_ref() == Some(bounds) {
            self.last_fetched = None;
        }
    }
}

/// The map library that draws the blocks.
///
/// Click and hover notifications go the other way: the implementation turns
/// them into [`SessionEvent::FeatureClicked`] and [`SessionEvent::FeatureHovered`].
pub trait Renderer {
    /// The geometry of a feature, opaque to the session.
    type Geometry;

    fn viewport_bounds(&self) -> Bounds;

    fn add_features(&mut self, features: Vec<(BlockId, Self::Geometry)>);

    fn clear_features(&mut self);

    fn set_feature_style(&mut self, id: &BlockId, style: &BlockStyle);
}

impl MapSession {
    /// Applies one event to the session and returns what the driver needs to
    /// do next.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Vec<Effect>, SessionError> {
        match event {
            SessionEvent::ViewportChanged(bounds) => {
                if self.viewport_mut().should_fetch(&bounds) {
                    info!("Viewport changed to {}", bounds);
                    Ok(vec![Effect::Fetch(bounds)])
                } else {
                    debug!("apply: viewport {} unchanged, skipping fetch", bounds);
                    Ok(vec![])
                }
            }
            SessionEvent::FetchCompleted { bounds, blocks } => {
                debug!("apply: fetch for {} returned {} blocks", bounds, blocks.len());
                let maxima_before = (self.totals().max_dem_voters, self.totals().max_rep_voters);
                let loaded = self.ingest_blocks(&blocks);
                if loaded.is_empty() {
                    return Ok(vec![]);
                }
                let maxima_after = (self.totals().max_dem_voters, self.totals().max_rep_voters);
                let mut effects = vec![Effect::AddFeatures(loaded.clone())];
                // In count mode, a new maximum changes the opacity of every block.
                if self.rules().opacity_mode == OpacityMode::Count && maxima_before != maxima_after
                {
                    effects.push(Effect::RestyleAll);
                } else {
                    effects.push(Effect::Restyle(loaded));
                }
                Ok(effects)
            }
            SessionEvent::FetchFailed { bounds, reason } => {
                warn!("Fetching blocks for {} failed: {}", bounds, reason);
                self.viewport_mut().forget(&bounds);
                Ok(vec![])
            }
            SessionEvent::FeatureClicked(id) => {
                self.toggle_selection(&id)?;
                Ok(vec![Effect::Restyle(vec![id])])
            }
            SessionEvent::FeatureHovered(id) => {
                let report = self.report(&id)?;
                Ok(vec![Effect::ShowReport(report)])
            }
            SessionEvent::CoefficientsChanged(coefficients) => {
                self.set_coefficients(&coefficients);
                Ok(vec![Effect::RestyleAll])
            }
            SessionEvent::Reload(bounds) => {
                self.reset();
                self.viewport_mut().should_fetch(&bounds);
                Ok(vec![Effect::ClearFeatures, Effect::Fetch(bounds)])
            }
        }
    }
}
