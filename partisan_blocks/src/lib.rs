/*!
Partisan-lean estimates for census blocks, and the running tallies of a map
session that streams those blocks in.

The crate is split in two layers:
- [`compute_stats`] turns the raw counts of one block into percentages and a
  vote estimate, using a fixed linear regression.
- [`MapSession`] keeps track of the blocks already loaded in a session, their
  selection and the running totals. It is driven by [`SessionEvent`]s and
  answers with [`Effect`]s for the map renderer.

```
use partisan_blocks::*;

let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
let block = BlockDemographics {
    id: BlockId::new("42"),
    name: None,
    over18: 100,
    black: 40.0,
    hispanic: 10.0,
    other_race: 5.0,
    unmarried: 20.0,
    childless: 15.0,
};
assert_eq!(session.ingest_fetch(&[block.clone(), block]), 1);
session.toggle_selection(&BlockId::new("42"))?;
assert!((session.totals().selected_votes - 18.79).abs() < 0.01);
# Ok::<(), SessionError>(())
```
*/
mod config;
mod events;
mod report;
mod style;

pub mod builder;
pub mod manual;

use log::{debug, info};

use std::collections::HashMap;

pub use crate::config::*;
pub use crate::events::*;
pub use crate::report::*;
pub use crate::style::*;

/// Computes the derived statistics of a block for a given set of coefficients.
///
/// This function is total: a block without voting-age population gets all its
/// statistics set to zero instead of dividing by zero. Inconsistent counts are
/// not corrected and may lead to a negative white population or to a share
/// outside of [0, 1].
pub fn compute_stats(
    demographics: &BlockDemographics,
    coefficients: &RegressionCoefficients,
) -> BlockStats {
    if demographics.over18 == 0 {
        return BlockStats::default();
    }
    let over18 = demographics.over18 as f64;
    let non_white = demographics.black + demographics.hispanic + demographics.other_race;
    let white = over18 - non_white;

    let black_pct = demographics.black / over18;
    let hispanic_pct = demographics.hispanic / over18;
    let other_race_pct = demographics.other_race / over18;
    let unmarried_pct = demographics.unmarried / over18;
    let childless_pct = demographics.childless / over18;

    let dem_share = coefficients.constant
        + coefficients.black * black_pct
        + coefficients.hispanic * hispanic_pct
        + coefficients.other_race * other_race_pct
        + coefficients.unmarried * unmarried_pct
        + coefficients.childless * childless_pct;
    let dem_votes = over18 * dem_share;
    let rep_votes = over18 - dem_votes;

    BlockStats {
        white,
        black_pct,
        hispanic_pct,
        other_race_pct,
        white_pct: white / over18,
        unmarried_pct,
        childless_pct,
        dem_share,
        dem_votes,
        rep_votes,
        net_votes: dem_votes - rep_votes,
    }
}

// **** Private structures ****

#[derive(PartialEq, Debug, Clone)]
struct LoadedBlock {
    demographics: BlockDemographics,
    stats: BlockStats,
    selected: bool,
}

/// Adds one block to the running totals. The maximum for a party only moves
/// when the block is strictly above it.
fn fold_block(totals: &mut SessionTotals, over18: u64, stats: &BlockStats) {
    totals.total_voters += over18 as f64;
    totals.dem_voters += stats.dem_votes;
    totals.rep_voters += stats.rep_votes;
    if stats.dem_votes > totals.max_dem_voters {
        totals.max_dem_voters = stats.dem_votes;
    }
    if stats.rep_votes > totals.max_rep_voters {
        totals.max_rep_voters = stats.rep_votes;
    }
}

/// The state of one map session: the loaded blocks, their selection and the
/// running totals.
///
/// Blocks are kept in the order they were loaded. A block never leaves the
/// session, except through [`MapSession::reset`].
#[derive(Debug, Clone)]
pub struct MapSession {
    coefficients: RegressionCoefficients,
    rules: StyleRules,
    // Invariant: `index` maps every loaded id to its position in `blocks`.
    blocks: Vec<LoadedBlock>,
    index: HashMap<BlockId, usize>,
    totals: SessionTotals,
    viewport: ViewportTracker,
}

impl MapSession {
    pub fn new(coefficients: &RegressionCoefficients) -> MapSession {
        MapSession::with_rules(coefficients, StyleRules::default_rules())
    }

    pub fn with_rules(coefficients: &RegressionCoefficients, rules: StyleRules) -> MapSession {
        MapSession {
            coefficients: *coefficients,
            rules,
            blocks: Vec::new(),
            index: HashMap::new(),
            totals: SessionTotals::default(),
            viewport: ViewportTracker::default(),
        }
    }

    pub fn coefficients(&self) -> &RegressionCoefficients {
        &self.coefficients
    }

    pub fn rules(&self) -> &StyleRules {
        &self.rules
    }

    pub fn totals(&self) -> &SessionTotals {
        &self.totals
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.index.contains_key(id)
    }

    /// The ids of the loaded blocks, in loading order.
    pub fn loaded_ids(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .map(|b| b.demographics.id.clone())
            .collect()
    }

    /// The ids of the selected blocks, in loading order.
    pub fn selected_ids(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| b.selected)
            .map(|b| b.demographics.id.clone())
            .collect()
    }

    pub fn stats(&self, id: &BlockId) -> Result<&BlockStats, SessionError> {
        self.get(id).map(|b| &b.stats)
    }

    pub fn demographics(&self, id: &BlockId) -> Result<&BlockDemographics, SessionError> {
        self.get(id).map(|b| &b.demographics)
    }

    pub fn is_selected(&self, id: &BlockId) -> Result<bool, SessionError> {
        self.get(id).map(|b| b.selected)
    }

    pub fn viewport(&self) -> &ViewportTracker {
        &self.viewport
    }

    pub(crate) fn viewport_mut(&mut self) -> &mut ViewportTracker {
        &mut self.viewport
    }

    fn get(&self, id: &BlockId) -> Result<&LoadedBlock, SessionError> {
        self.index
            .get(id)
            .map(|idx| &self.blocks[*idx])
            .ok_or_else(|| SessionError::NotFound { id: id.clone() })
    }

    /// Loads the blocks of one fetch, in order, and returns how many of them
    /// were not already in the session.
    ///
    /// A block that was already loaded is dropped: it is never counted twice,
    /// even when overlapping viewports return it again.
    pub fn ingest_fetch(&mut self, blocks: &[BlockDemographics]) -> usize {
        self.ingest_blocks(blocks).len()
    }

    /// Same as [`MapSession::ingest_fetch`], returning the ids of the new blocks.
    pub fn ingest_blocks(&mut self, blocks: &[BlockDemographics]) -> Vec<BlockId> {
        let mut loaded: Vec<BlockId> = Vec::new();
        for demographics in blocks.iter() {
            if self.index.contains_key(&demographics.id) {
                debug!("ingest_blocks: skipping already loaded block {}", demographics.id);
                continue;
            }
            let stats = compute_stats(demographics, &self.coefficients);
            debug!(
                "ingest_blocks: loading block {} over18: {} stats: {:?}",
                demographics.id, demographics.over18, stats
            );
            fold_block(&mut self.totals, demographics.over18, &stats);
            self.index
                .insert(demographics.id.clone(), self.blocks.len());
            self.blocks.push(LoadedBlock {
                demographics: demographics.clone(),
                stats,
                selected: false,
            });
            loaded.push(demographics.id.clone());
        }
        info!(
            "Ingested {} blocks: {} new, {} loaded in total",
            blocks.len(),
            loaded.len(),
            self.blocks.len()
        );
        loaded
    }

    /// Flips the selection of a loaded block and returns the new selection state.
    pub fn toggle_selection(&mut self, id: &BlockId) -> Result<bool, SessionError> {
        let idx = *self
            .index
            .get(id)
            .ok_or_else(|| SessionError::NotFound { id: id.clone() })?;
        let block = &mut self.blocks[idx];
        block.selected = !block.selected;
        if block.selected {
            self.totals.selected_votes += block.stats.net_votes;
        } else {
            self.totals.selected_votes -= block.stats.net_votes;
        }
        debug!(
            "toggle_selection: block {} selected: {} selected votes: {}",
            id, block.selected, self.totals.selected_votes
        );
        Ok(block.selected)
    }

    /// Replaces the coefficients, recomputes the statistics of every loaded
    /// block and folds all the totals again from scratch.
    ///
    /// Selections are kept.
    pub fn set_coefficients(&mut self, coefficients: &RegressionCoefficients) {
        info!("Coefficients changed: {:?}", coefficients);
        self.coefficients = *coefficients;
        self.recompute();
    }

    fn recompute(&mut self) {
        let mut totals = SessionTotals::default();
        for block in self.blocks.iter_mut() {
            block.stats = compute_stats(&block.demographics, &self.coefficients);
            fold_block(&mut totals, block.demographics.over18, &block.stats);
        }
        for block in self.blocks.iter().filter(|b| b.selected) {
            totals.selected_votes += block.stats.net_votes;
        }
        info!(
            "Recomputed {} blocks: total voters: {} dem: {} rep: {} selected: {}",
            self.blocks.len(),
            totals.total_voters,
            totals.dem_voters,
            totals.rep_voters,
            totals.selected_votes
        );
        self.totals = totals;
    }

    pub fn set_rules(&mut self, rules: StyleRules) -> Result<(), SessionError> {
        rules.check()?;
        self.rules = rules;
        Ok(())
    }

    /// Forgets everything about the session: loaded blocks, selections,
    /// totals and the last fetched viewport.
    pub fn reset(&mut self) {
        info!("Resetting session with {} loaded blocks", self.blocks.len());
        self.blocks.clear();
        self.index.clear();
        self.totals = SessionTotals::default();
        self.viewport = ViewportTracker::default();
    }

    /// The display style of a loaded block, given the current state of the session.
    pub fn style(&self, id: &BlockId) -> Result<BlockStyle, SessionError> {
        let block = self.get(id)?;
        Ok(derive_style(
            &StyleInput {
                over18: block.demographics.over18,
                stats: &block.stats,
                selected: block.selected,
            },
            &self.totals,
            &self.rules,
        ))
    }

    /// The details shown when hovering over a block.
    pub fn report(&self, id: &BlockId) -> Result<BlockReport, SessionError> {
        let block = self.get(id)?;
        Ok(BlockReport::new(&block.demographics, &block.stats))
    }

    /// Pushes the current style of the given blocks to a renderer.
    pub fn paint<R: Renderer>(&self, renderer: &mut R, ids: &[BlockId]) -> Result<(), SessionError> {
        for id in ids.iter() {
            let style = self.style(id)?;
            renderer.set_feature_style(id, &style);
        }
        Ok(())
    }

    /// Pushes the current style of every loaded block to a renderer.
    pub fn paint_all<R: Renderer>(&self, renderer: &mut R) -> Result<(), SessionError> {
        self.paint(renderer, &self.loaded_ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    pub(crate) fn block(id: &str, over18: u64, counts: [f64; 5]) -> BlockDemographics {
        BlockDemographics {
            id: BlockId::new(id),
            name: Some(format!("Block {}", id)),
            over18,
            black: counts[0],
            hispanic: counts[1],
            other_race: counts[2],
            unmarried: counts[3],
            childless: counts[4],
        }
    }

    fn sample_blocks() -> Vec<BlockDemographics> {
        vec![
            block("1", 100, [40.0, 10.0, 5.0, 20.0, 15.0]),
            block("2", 250, [5.0, 5.0, 5.0, 30.0, 10.0]),
            block("3", 0, [0.0, 0.0, 0.0, 0.0, 0.0]),
            block("4", 80, [70.0, 5.0, 0.0, 60.0, 40.0]),
        ]
    }

    #[test]
    fn stats_reference_block() {
        init();
        let stats = compute_stats(
            &block("42", 100, [40.0, 10.0, 5.0, 20.0, 15.0]),
            &RegressionCoefficients::DEFAULT_COEFFICIENTS,
        );
        let expected_share = 0.3638054
            + 0.4501479 * 0.4
            + 0.077551 * 0.1
            + 0.1358834 * 0.05
            + 0.0911239 * 0.2
            + 0.115441 * 0.15;
        assert!((stats.dem_share - expected_share).abs() < EPS);
        assert!((stats.dem_share - 0.5940).abs() < 1e-4);
        assert!((stats.dem_votes - 59.40).abs() < 0.01);
        assert!((stats.rep_votes - 40.60).abs() < 0.01);
        assert!((stats.net_votes - 18.79).abs() < 0.01);
        assert_eq!(stats.white, 45.0);
        assert!((stats.white_pct - 0.45).abs() < EPS);
    }

    #[test]
    fn stats_empty_block_is_zero() {
        let stats = compute_stats(
            &block("0", 0, [3.0, 2.0, 1.0, 7.0, 4.0]),
            &RegressionCoefficients::DEFAULT_COEFFICIENTS,
        );
        assert_eq!(stats, BlockStats::default());
    }

    #[test]
    fn stats_votes_add_up() {
        let coefficients = RegressionCoefficients {
            black: 1.7,
            hispanic: -0.3,
            other_race: 0.9,
            unmarried: 2.5,
            childless: -1.1,
            constant: 0.05,
        };
        for b in sample_blocks().iter().filter(|b| b.over18 > 0) {
            let stats = compute_stats(b, &coefficients);
            assert!((stats.dem_votes + stats.rep_votes - b.over18 as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn stats_are_not_clamped() {
        // The categories overlap: more non-white people than voters.
        let stats = compute_stats(
            &block("x", 10, [10.0, 10.0, 10.0, 10.0, 10.0]),
            &RegressionCoefficients::DEFAULT_COEFFICIENTS,
        );
        assert_eq!(stats.white, -20.0);
        assert!(stats.dem_share > 1.0);
        assert!(stats.rep_votes < 0.0);
    }

    #[test]
    fn ingest_is_idempotent() {
        init();
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        assert_eq!(session.ingest_fetch(&sample_blocks()), 4);
        let totals = *session.totals();
        assert_eq!(session.ingest_fetch(&sample_blocks()), 0);
        assert_eq!(*session.totals(), totals);
        assert_eq!(session.len(), 4);
    }

    #[test]
    fn overlapping_fetches_count_once() {
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        let first = vec![
            block("41", 30, [1.0, 2.0, 3.0, 4.0, 5.0]),
            block("42", 100, [40.0, 10.0, 5.0, 20.0, 15.0]),
        ];
        let second = vec![
            block("42", 100, [40.0, 10.0, 5.0, 20.0, 15.0]),
            block("43", 12, [0.0, 0.0, 0.0, 6.0, 2.0]),
        ];
        session.ingest_fetch(&first);
        assert_eq!(session.totals().total_voters, 130.0);
        assert_eq!(session.ingest_fetch(&second), 1);
        assert_eq!(session.totals().total_voters, 142.0);
    }

    #[test]
    fn duplicate_inside_one_fetch() {
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        let b = block("7", 50, [1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(session.ingest_fetch(&[b.clone(), b]), 1);
        assert_eq!(session.totals().total_voters, 50.0);
    }

    #[test]
    fn party_totals_and_maxima() {
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        session.ingest_fetch(&sample_blocks());
        let stats: Vec<BlockStats> = sample_blocks()
            .iter()
            .map(|b| compute_stats(b, &RegressionCoefficients::DEFAULT_COEFFICIENTS))
            .collect();
        let totals = session.totals();
        assert_eq!(totals.total_voters, 430.0);
        let dem: f64 = stats.iter().map(|s| s.dem_votes).sum();
        let rep: f64 = stats.iter().map(|s| s.rep_votes).sum();
        assert!((totals.dem_voters - dem).abs() < EPS);
        assert!((totals.rep_voters - rep).abs() < EPS);
        let max_dem = stats.iter().map(|s| s.dem_votes).fold(0.0, f64::max);
        let max_rep = stats.iter().map(|s| s.rep_votes).fold(0.0, f64::max);
        assert_eq!(totals.max_dem_voters, max_dem);
        assert_eq!(totals.max_rep_voters, max_rep);
    }

    #[test]
    fn maximum_ties_keep_existing() {
        let mut totals = SessionTotals::default();
        let first = BlockStats {
            dem_votes: 10.0,
            rep_votes: 5.0,
            ..BlockStats::default()
        };
        fold_block(&mut totals, 15, &first);
        let second = BlockStats {
            dem_votes: 10.0,
            rep_votes: 4.0,
            ..BlockStats::default()
        };
        fold_block(&mut totals, 14, &second);
        assert_eq!(totals.max_dem_voters, 10.0);
        assert_eq!(totals.max_rep_voters, 5.0);
    }

    #[test]
    fn toggle_is_an_involution() {
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        session.ingest_fetch(&sample_blocks());
        let id = BlockId::new("2");
        session.toggle_selection(&BlockId::new("1")).unwrap();
        let before = session.totals().selected_votes;
        assert_eq!(session.toggle_selection(&id), Ok(true));
        let net = session.stats(&id).unwrap().net_votes;
        assert!((session.totals().selected_votes - before - net).abs() < EPS);
        assert_eq!(session.toggle_selection(&id), Ok(false));
        assert!((session.totals().selected_votes - before).abs() < EPS);
    }

    #[test]
    fn toggle_unknown_block() {
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        session.ingest_fetch(&sample_blocks());
        let res = session.toggle_selection(&BlockId::new("nope"));
        assert_eq!(
            res,
            Err(SessionError::NotFound {
                id: BlockId::new("nope")
            })
        );
        assert_eq!(session.totals().selected_votes, 0.0);
    }

    #[test]
    fn recompute_matches_replay() {
        let coefficients = RegressionCoefficients {
            black: 0.2,
            hispanic: 0.4,
            other_race: 0.1,
            unmarried: 0.3,
            childless: 0.05,
            constant: 0.25,
        };
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        session.ingest_fetch(&sample_blocks()[..2]);
        session.ingest_fetch(&sample_blocks()[1..]);
        session.set_coefficients(&coefficients);

        let mut replay = MapSession::new(&coefficients);
        replay.ingest_fetch(&sample_blocks());
        assert_eq!(session.totals(), replay.totals());
        for id in replay.loaded_ids() {
            assert_eq!(session.stats(&id), replay.stats(&id));
        }
    }

    #[test]
    fn recompute_keeps_selection() {
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        session.ingest_fetch(&sample_blocks());
        session.toggle_selection(&BlockId::new("4")).unwrap();
        session.toggle_selection(&BlockId::new("1")).unwrap();
        let coefficients = RegressionCoefficients {
            constant: 0.1,
            ..RegressionCoefficients::DEFAULT_COEFFICIENTS
        };
        session.set_coefficients(&coefficients);
        assert_eq!(session.is_selected(&BlockId::new("4")), Ok(true));
        let expected = session.stats(&BlockId::new("1")).unwrap().net_votes
            + session.stats(&BlockId::new("4")).unwrap().net_votes;
        assert!((session.totals().selected_votes - expected).abs() < EPS);
        assert_eq!(
            session.selected_ids(),
            vec![BlockId::new("1"), BlockId::new("4")]
        );
    }

    #[test]
    fn reset_empties_session() {
        let mut session = MapSession::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS);
        session.ingest_fetch(&sample_blocks());
        session.toggle_selection(&BlockId::new("1")).unwrap();
        session.reset();
        assert!(session.is_empty());
        assert_eq!(*session.totals(), SessionTotals::default());
        assert_eq!(session.ingest_fetch(&sample_blocks()), 4);
        assert_eq!(session.is_selected(&BlockId::new("1")), Ok(false));
    }
}
