use crate::error::Result;
use crate::models::{Statistic, ZonalStatRecord};
use csv::Writer;
use std::path::Path;

/// Base columns of every site partition, in order.
pub const BASE_COLUMNS: [&str; 6] = ["ident", "site", "im_date", "mean", "im_name", "d_type"];

/// Writes site partitions as CSV. Missing statistics become empty fields.
#[derive(Debug, Clone)]
pub struct SiteCsvWriter {
    /// Output code used to prefix the extra statistic columns.
    output_code: String,
    all_statistics: bool,
}

impl SiteCsvWriter {
    pub fn new(output_code: impl Into<String>) -> Self {
        Self {
            output_code: output_code.into(),
            all_statistics: false,
        }
    }

    /// Append `{output_code}_{stat}` columns for the rest of the battery
    /// after `mean`.
    pub fn with_all_statistics(mut self, enabled: bool) -> Self {
        self.all_statistics = enabled;
        self
    }

    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = BASE_COLUMNS[..4].iter().map(|c| c.to_string()).collect();
        if self.all_statistics {
            header.extend(
                Self::extra_statistics().map(|s| format!("{}_{}", self.output_code, s.column_suffix())),
            );
        }
        header.extend(BASE_COLUMNS[4..].iter().map(|c| c.to_string()));
        header
    }

    /// Create or overwrite `path` with the header and one row per record.
    pub fn write<'a, I>(&self, path: &Path, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a ZonalStatRecord>,
    {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(self.header())?;

        let mut written = 0;
        for record in records {
            writer.write_record(self.row(record))?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    fn row(&self, record: &ZonalStatRecord) -> Vec<String> {
        let mut row = vec![
            record.ident.to_string(),
            record.site.clone(),
            record.im_date.clone(),
            format_value(record.stats.mean),
        ];
        if self.all_statistics {
            row.extend(Self::extra_statistics().map(|s| format_value(record.stats.get(s))));
        }
        row.push(record.im_name.clone());
        row.push(record.d_type.clone());
        row
    }

    fn extra_statistics() -> impl Iterator<Item = Statistic> {
        Statistic::ALL.into_iter().filter(|s| *s != Statistic::Mean)
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
