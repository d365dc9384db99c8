use serde::{Deserialize, Serialize};
use std::fmt;

/// One member of the per-zone statistic battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Count,
    Min,
    Max,
    Mean,
    Median,
    Std,
    P25,
    P50,
    P75,
    P95,
    P99,
    Range,
}

impl Statistic {
    pub const ALL: [Statistic; 12] = [
        Statistic::Count,
        Statistic::Min,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Median,
        Statistic::Std,
        Statistic::P25,
        Statistic::P50,
        Statistic::P75,
        Statistic::P95,
        Statistic::P99,
        Statistic::Range,
    ];

    /// Statistics expressed in the raster's scaled integer units. Count is a
    /// cell tally and std is left as computed.
    pub const SCALED: [Statistic; 10] = [
        Statistic::Min,
        Statistic::Max,
        Statistic::Mean,
        Statistic::Median,
        Statistic::P25,
        Statistic::P50,
        Statistic::P75,
        Statistic::P95,
        Statistic::P99,
        Statistic::Range,
    ];

    pub fn column_suffix(&self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Mean => "mean",
            Statistic::Median => "med",
            Statistic::Std => "std",
            Statistic::P25 => "p25",
            Statistic::P50 => "p50",
            Statistic::P75 => "p75",
            Statistic::P95 => "p95",
            Statistic::P99 => "p99",
            Statistic::Range => "range",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_suffix())
    }
}

/// Summary of the valid cells a zone touches. Everything except `count` is
/// `None` when the zone touched no valid cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneStatistics {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub range: Option<f64>,
}

impl ZoneStatistics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, statistic: Statistic) -> Option<f64> {
        match statistic {
            Statistic::Count => Some(self.count as f64),
            Statistic::Min => self.min,
            Statistic::Max => self.max,
            Statistic::Mean => self.mean,
            Statistic::Median => self.median,
            Statistic::Std => self.std,
            Statistic::P25 => self.p25,
            Statistic::P50 => self.p50,
            Statistic::P75 => self.p75,
            Statistic::P95 => self.p95,
            Statistic::P99 => self.p99,
            Statistic::Range => self.range,
        }
    }

    /// Mutable slot for a value statistic; `None` for `Count`.
    pub fn slot_mut(&mut self, statistic: Statistic) -> Option<&mut Option<f64>> {
        match statistic {
            Statistic::Count => None,
            Statistic::Min => Some(&mut self.min),
            Statistic::Max => Some(&mut self.max),
            Statistic::Mean => Some(&mut self.mean),
            Statistic::Median => Some(&mut self.median),
            Statistic::Std => Some(&mut self.std),
            Statistic::P25 => Some(&mut self.p25),
            Statistic::P50 => Some(&mut self.p50),
            Statistic::P75 => Some(&mut self.p75),
            Statistic::P95 => Some(&mut self.p95),
            Statistic::P99 => Some(&mut self.p99),
            Statistic::Range => Some(&mut self.range),
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// One (zone, image) row of zonal output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalStatRecord {
    pub ident: u32,
    pub site: String,
    pub im_date: String,
    pub stats: ZoneStatistics,
    pub im_name: String,
    pub d_type: String,
}

impl ZonalStatRecord {
    pub fn mean(&self) -> Option<f64> {
        self.stats.mean
    }
}
