pub use crate::config::*;
use crate::MapSession;

/// A builder for setting up a session.
///
/// It is convenient for replaying a known set of blocks, for example to
/// compare two sets of coefficients.
///
/// ```
/// pub use partisan_blocks::builder::Builder;
/// pub use partisan_blocks::RegressionCoefficients;
/// # use partisan_blocks::SessionError;
///
/// let mut builder = Builder::new(&RegressionCoefficients::DEFAULT_COEFFICIENTS)?
///     .min_opacity(0.2)?;
///
/// builder.add_block_simple("42", 100, &[40.0, 10.0, 5.0, 20.0, 15.0])?;
/// builder.select("42")?;
///
/// let session = builder.build()?;
/// assert_eq!(session.len(), 1);
///
/// # Ok::<(), SessionError>(())
/// ```
pub struct Builder {
    pub(crate) _coefficients: RegressionCoefficients,
    pub(crate) _rules: StyleRules,
    pub(crate) _blocks: Vec<BlockDemographics>,
    pub(crate) _selected: Vec<BlockId>,
}

impl Builder {
    pub fn new(coefficients: &RegressionCoefficients) -> Result<Builder, SessionError> {
        Ok(Builder {
            _coefficients: *coefficients,
            _rules: StyleRules::default_rules(),
            _blocks: Vec::new(),
            _selected: Vec::new(),
        })
    }

    pub fn rules(self, rules: StyleRules) -> Result<Builder, SessionError> {
        rules.check()?;
        Ok(Builder {
            _rules: rules,
            ..self
        })
    }

    pub fn min_opacity(self, min_opacity: f64) -> Result<Builder, SessionError> {
        let rules = StyleRules {
            min_opacity,
            ..self._rules.clone()
        };
        self.rules(rules)
    }

    pub fn opacity_mode(self, opacity_mode: OpacityMode) -> Result<Builder, SessionError> {
        let rules = StyleRules {
            opacity_mode,
            ..self._rules.clone()
        };
        self.rules(rules)
    }

    /// Adds a block from its raw counts.
    ///
    /// counts: black, hispanic, other race, unmarried and childless, in this
    /// order. Missing trailing counts are zero.
    pub fn add_block_simple(
        &mut self,
        id: &str,
        over18: u64,
        counts: &[f64],
    ) -> Result<(), SessionError> {
        let count = |idx: usize| counts.get(idx).cloned().unwrap_or(0.0);
        self.add_block(&BlockDemographics {
            id: BlockId::new(id),
            name: None,
            over18,
            black: count(0),
            hispanic: count(1),
            other_race: count(2),
            unmarried: count(3),
            childless: count(4),
        })
    }

    pub fn add_block(&mut self, block: &BlockDemographics) -> Result<(), SessionError> {
        self._blocks.push(block.clone());
        Ok(())
    }

    /// Marks a block as selected once the session is built. Selecting a block
    /// more than once has no further effect.
    pub fn select(&mut self, id: &str) -> Result<(), SessionError> {
        self._selected.push(BlockId::new(id));
        Ok(())
    }

    /// Loads all the blocks in one fetch, then applies the selections.
    ///
    /// Fails if a selected block was never added.
    pub fn build(self) -> Result<MapSession, SessionError> {
        let mut session = MapSession::with_rules(&self._coefficients, self._rules);
        session.ingest_fetch(&self._blocks);
        for id in self._selected.iter() {
            if !session.is_selected(id)? {
                session.toggle_selection(id)?;
            }
        }
        Ok(session)
    }
}
