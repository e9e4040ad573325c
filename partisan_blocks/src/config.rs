// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The identifier of a census block.
///
/// The lookup service may send identifiers as strings or as numbers. Both are
/// kept in their textual form so that `"42"` and `42` refer to the same block.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> BlockId {
        BlockId(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> BlockId {
        BlockId(s.to_string())
    }
}

/// The raw counts for one census block, as returned by the lookup service.
///
/// The counts are not required to add up to `over18`. Nothing is validated:
/// overlapping categories show up as a negative white population.
#[derive(PartialEq, Debug, Clone)]
pub struct BlockDemographics {
    pub id: BlockId,
    pub name: Option<String>,
    /// Population over voting age.
    pub over18: u64,
    pub black: f64,
    pub hispanic: f64,
    pub other_race: f64,
    pub unmarried: f64,
    pub childless: f64,
}

// ******** Output data structures *********

/// Derived statistics for one block.
///
/// All the fields are zero for a block with no voting-age population.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct BlockStats {
    pub white: f64,
    pub black_pct: f64,
    pub hispanic_pct: f64,
    pub other_race_pct: f64,
    pub white_pct: f64,
    pub unmarried_pct: f64,
    pub childless_pct: f64,
    /// Estimated fraction of the voters for the tracked party.
    /// Not clamped: the regression may extrapolate outside of [0, 1].
    pub dem_share: f64,
    pub dem_votes: f64,
    pub rep_votes: f64,
    /// Signed margin, positive when the block favors the tracked party.
    pub net_votes: f64,
}

/// Running totals over all the loaded blocks of a session.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct SessionTotals {
    pub total_voters: f64,
    pub dem_voters: f64,
    pub rep_voters: f64,
    pub max_dem_voters: f64,
    pub max_rep_voters: f64,
    pub selected_votes: f64,
}

/// Errors returned by the session operations.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SessionError {
    /// The block was never loaded in this session.
    NotFound { id: BlockId },
    /// The styling options cannot produce a valid opacity.
    InvalidStyle { min_opacity: String },
}

impl Error for SessionError {}

impl Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotFound { id } => write!(f, "block {} is not loaded", id),
            SessionError::InvalidStyle { min_opacity } => {
                write!(f, "minimum opacity must be within [0, 1], got {}", min_opacity)
            }
        }
    }
}

// ********* Configuration **********

/// The weights of the linear regression that estimates the share of the
/// tracked party in a block.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct RegressionCoefficients {
    pub black: f64,
    pub hispanic: f64,
    pub other_race: f64,
    pub unmarried: f64,
    pub childless: f64,
    pub constant: f64,
}

impl RegressionCoefficients {
    pub const DEFAULT_COEFFICIENTS: RegressionCoefficients = RegressionCoefficients {
        black: 0.4501479,
        hispanic: 0.077551,
        other_race: 0.1358834,
        unmarried: 0.0911239,
        childless: 0.115441,
        constant: 0.3638054,
    };
}

impl Default for RegressionCoefficients {
    fn default() -> Self {
        RegressionCoefficients::DEFAULT_COEFFICIENTS
    }
}

/// Where the fill opacity of a block comes from.
///
/// - Share uses the estimated share of the winning party in the block.
///
/// - Count compares the votes of the winning party in the block with the
/// largest such count seen in the session.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum OpacityMode {
    Share,
    Count,
}

/// A color in `#RRGGBB` form.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Color(pub String);

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct StyleRules {
    pub opacity_mode: OpacityMode,
    /// Lower bound of the fill opacity, so that empty blocks stay visible.
    pub min_opacity: f64,
    pub dem_color: Color,
    pub rep_color: Color,
    pub neutral_color: Color,
    pub stroke_weight: u32,
}

impl StyleRules {
    pub fn default_rules() -> StyleRules {
        StyleRules {
            opacity_mode: OpacityMode::Share,
            min_opacity: 0.15,
            dem_color: Color("#4488CC".to_string()),
            rep_color: Color("#BB4444".to_string()),
            neutral_color: Color("#FFFFFF".to_string()),
            stroke_weight: 2,
        }
    }

    pub fn check(&self) -> Result<(), SessionError> {
        if (0.0..=1.0).contains(&self.min_opacity) {
            Ok(())
        } else {
            Err(SessionError::InvalidStyle {
                min_opacity: self.min_opacity.to_string(),
            })
        }
    }
}

impl Default for StyleRules {
    fn default() -> Self {
        StyleRules::default_rules()
    }
}

/// The bounding box of a viewport, as sent to the lookup service.
///
/// `lat1`/`lon1` is the north-east corner and `lat2`/`lon2` the south-west
/// corner.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Bounds {
    pub lat1: f64,
    pub lon1: f64,
    pub lat2: f64,
    pub lon2: f64,
}

impl Bounds {
    /// A box of the given span (in degrees) around a point.
    pub fn around(lat: f64, lon: f64, lat_span: f64, lon_span: f64) -> Bounds {
        Bounds {
            lat1: lat + lat_span / 2.0,
            lon1: lon + lon_span / 2.0,
            lat2: lat - lat_span / 2.0,
            lon2: lon - lon_span / 2.0,
        }
    }
}

impl Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.lat1, self.lon1, self.lat2, self.lon2
        )
    }
}
