use crate::models::record::ZonalStatRecord;
use std::collections::HashMap;

/// All records of one (variable, naming class) run, tagged with the run's
/// data-type label.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalStatsTable {
    data_type: String,
    rows: Vec<ZonalStatRecord>,
}

impl ZonalStatsTable {
    /// Rows keep their given order; every row's `d_type` is set to `data_type`.
    pub fn new(data_type: impl Into<String>, rows: Vec<ZonalStatRecord>) -> Self {
        let data_type = data_type.into();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.d_type.clone_from(&data_type);
                row
            })
            .collect();
        Self { data_type, rows }
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn rows(&self) -> &[ZonalStatRecord] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [ZonalStatRecord] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<ZonalStatRecord> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct sites in first-appearance order.
    pub fn site_names(&self) -> Vec<String> {
        let mut seen = HashMap::new();
        let mut names = Vec::new();
        for row in &self.rows {
            if seen.insert(row.site.as_str(), ()).is_none() {
                names.push(row.site.clone());
            }
        }
        names
    }

    /// Split rows by site, preserving row order inside each group and the
    /// first-appearance order of the sites.
    pub fn group_by_site(&self) -> Vec<(String, Vec<&ZonalStatRecord>)> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<&ZonalStatRecord>)> = Vec::new();
        for row in &self.rows {
            let slot = *index.entry(row.site.as_str()).or_insert_with(|| {
                groups.push((row.site.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(row);
        }
        groups
    }

    /// Stable sort by date token then zone id. Only meaningful once dates are
    /// parsed; the engine itself never reorders.
    pub fn sort_chronologically(&mut self) {
        self.rows
            .sort_by(|a, b| a.im_date.cmp(&b.im_date).then_with(|| a.ident.cmp(&b.ident)));
    }
}
