use crate::error::{ProcessingError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filename convention of a raster directory, recognised from the terminal
/// token of the directory path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingClass {
    /// Corrected monthly surfaces, e.g. `..._m202001cor.tif`
    Cor,
    /// Seasonal average/median surfaces, e.g. `..._202001202003siav.tif`
    Seasonal,
    /// Moving average/median surfaces, e.g. `..._202001202012_mavg.tif`
    Moving,
}

impl NamingClass {
    pub const ALL: [NamingClass; 3] = [NamingClass::Cor, NamingClass::Seasonal, NamingClass::Moving];

    pub fn suffixes(&self) -> &'static [&'static str] {
        match self {
            NamingClass::Cor => &["cor"],
            NamingClass::Seasonal => &["siav", "simd"],
            NamingClass::Moving => &["mavg", "mmed"],
        }
    }

    /// Match a directory name against the known suffixes.
    pub fn from_dir_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|class| class.suffixes().iter().any(|s| token.ends_with(s)))
    }

    pub fn label(&self) -> &'static str {
        match self {
            NamingClass::Cor => "cor",
            NamingClass::Seasonal => "siav/simd",
            NamingClass::Moving => "mavg/mmed",
        }
    }

    pub fn default_rule(&self) -> DateRule {
        match self {
            NamingClass::Cor => DateRule {
                offsets: DateOffsets { start: -13, end: -7 },
                format: DateFormat::Month,
            },
            NamingClass::Seasonal => DateRule {
                offsets: DateOffsets { start: -20, end: -8 },
                format: DateFormat::MonthRange,
            },
            NamingClass::Moving => DateRule {
                offsets: DateOffsets { start: -21, end: -9 },
                format: DateFormat::MonthRange,
            },
        }
    }
}

impl fmt::Display for NamingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Negative character offsets, counted from the end of a filename, that
/// bracket the acquisition date token. An `end` of 0 means "to the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOffsets {
    pub start: i32,
    pub end: i32,
}

impl DateOffsets {
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if !(start < end && end <= 0) {
            return Err(ProcessingError::Config(format!(
                "Date offsets must satisfy start < end <= 0, got [{}:{}]",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn width(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Slice `name` by character position. `None` when the name is too short.
    pub fn slice(&self, name: &str) -> Option<String> {
        let chars: Vec<char> = name.chars().collect();
        let len = chars.len() as i64;
        let start = len + self.start as i64;
        let end = len + self.end as i64;
        if start < 0 {
            return None;
        }
        Some(chars[start as usize..end as usize].iter().collect())
    }
}

impl fmt::Display for DateOffsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYYMM`
    Month,
    /// `YYYYMMDD`
    Day,
    /// `YYYYMMYYYYMM`, first month not after the second
    MonthRange,
}

impl DateFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Month => "YYYYMM",
            DateFormat::Day => "YYYYMMDD",
            DateFormat::MonthRange => "YYYYMMYYYYMM",
        }
    }

    pub fn width(&self) -> usize {
        self.pattern().len()
    }

    pub fn is_valid(&self, token: &str) -> bool {
        if token.len() != self.width() || !token.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        match self {
            DateFormat::Month => parse_month(token).is_some(),
            DateFormat::Day => NaiveDate::parse_from_str(token, "%Y%m%d").is_ok(),
            DateFormat::MonthRange => match (parse_month(&token[..6]), parse_month(&token[6..])) {
                (Some(first), Some(last)) => first <= last,
                _ => false,
            },
        }
    }
}

fn parse_month(token: &str) -> Option<NaiveDate> {
    let year = token.get(..4)?.parse::<i32>().ok()?;
    let month = token.get(4..6)?.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Where a naming class keeps its date and what the date looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRule {
    pub offsets: DateOffsets,
    pub format: DateFormat,
}

impl DateRule {
    pub fn new(offsets: DateOffsets, format: DateFormat) -> Result<Self> {
        let offsets = DateOffsets::new(offsets.start, offsets.end)?;
        if offsets.width() != format.width() {
            return Err(ProcessingError::Config(format!(
                "Offsets {} select {} characters but {} needs {}",
                offsets,
                offsets.width(),
                format.pattern(),
                format.width()
            )));
        }
        Ok(Self { offsets, format })
    }

    /// Pull the acquisition date token out of a bare filename.
    pub fn extract(&self, file_name: &str) -> Result<String> {
        let token = self.offsets.slice(file_name).unwrap_or_default();
        if !self.format.is_valid(&token) {
            return Err(ProcessingError::DateParse {
                file: file_name.to_string(),
                token,
                expected: self.format.pattern(),
                offsets: self.offsets,
            });
        }
        Ok(token)
    }
}
