use std::fmt::Display;

use crate::config::*;

/// One line of the hover panel: a share and the corresponding head count.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReportRow {
    pub label: &'static str,
    /// Whole percentage.
    pub percent: i64,
    pub count: i64,
}

impl Display for ReportRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}% ({})", self.percent, self.count)
    }
}

/// The details displayed when hovering over a block.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BlockReport {
    pub id: BlockId,
    pub name: Option<String>,
    pub over18: u64,
    pub rows: Vec<ReportRow>,
}

// Halves round up, also for negative values.
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

impl BlockReport {
    pub fn new(demographics: &BlockDemographics, stats: &BlockStats) -> BlockReport {
        let row = |label: &'static str, pct: f64, count: f64| ReportRow {
            label,
            percent: round_half_up(pct * 100.0),
            count: round_half_up(count),
        };
        BlockReport {
            id: demographics.id.clone(),
            name: demographics.name.clone(),
            over18: demographics.over18,
            rows: vec![
                row("black", stats.black_pct, demographics.black),
                row("hispanic", stats.hispanic_pct, demographics.hispanic),
                row("other race", stats.other_race_pct, demographics.other_race),
                row("white", stats.white_pct, stats.white),
                row("unmarried", stats.unmarried_pct, demographics.unmarried),
                row("childless", stats.childless_pct, demographics.childless),
                row("democratic", stats.dem_share, stats.dem_votes),
            ],
        }
    }

    pub fn row(&self, label: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.label == label)
    }
}

impl Display for BlockReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.as_deref().unwrap_or("");
        writeln!(f, "block {} {}", self.id, name)?;
        writeln!(f, "  population: {}", self.over18)?;
        for r in self.rows.iter() {
            writeln!(f, "  {}: {}", r.label, r)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_stats;

    #[test]
    fn report_rows() {
        let demographics = BlockDemographics {
            id: BlockId::new("42"),
            name: Some("Block 1004".to_string()),
            over18: 100,
            black: 40.0,
            hispanic: 10.0,
            other_race: 5.0,
            unmarried: 20.0,
            childless: 15.0,
        };
        let stats = compute_stats(&demographics, &RegressionCoefficients::DEFAULT_COEFFICIENTS);
        let report = BlockReport::new(&demographics, &stats);
        assert_eq!(report.row("black").map(|r| r.to_string()), Some("40% (40)".to_string()));
        assert_eq!(report.row("white").map(|r| r.to_string()), Some("45% (45)".to_string()));
        assert_eq!(
            report.row("democratic").map(|r| r.to_string()),
            Some("59% (59)".to_string())
        );
        assert_eq!(report.rows.len(), 7);
        assert!(report.to_string().contains("Block 1004"));
    }

    #[test]
    fn rounding() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-20.4), -20);
    }
}
