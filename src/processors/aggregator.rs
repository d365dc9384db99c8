use crate::error::{ProcessingError, Result};
use crate::models::{ZonalStatRecord, ZonalStatsTable};
use crate::utils::constants::EMPTY_SITE_PLACEHOLDER;
use crate::utils::filename::{partition_file_name, sanitize_component};
use crate::writers::SiteCsvWriter;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Concatenate per-image records into one table, keeping their order.
pub fn aggregate<I>(records: I, data_type: &str) -> ZonalStatsTable
where
    I: IntoIterator<Item = Vec<ZonalStatRecord>>,
{
    ZonalStatsTable::new(data_type, records.into_iter().flatten().collect())
}

/// Splits a table into one CSV per site.
pub struct SitePartitioner {
    writer: SiteCsvWriter,
}

impl SitePartitioner {
    pub fn new(writer: SiteCsvWriter) -> Self {
        Self { writer }
    }

    /// Write `{site}_{data_type}_zonal_stats.csv` for every distinct site in
    /// `output_dir`, replacing existing files. A table with no sites still
    /// yields one placeholder-named file.
    pub fn partition_by_site(&self, table: &ZonalStatsTable, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let groups = table.group_by_site();

        if groups.is_empty() {
            let path = output_dir.join(partition_file_name(EMPTY_SITE_PLACEHOLDER, table.data_type()));
            self.writer.write(&path, table.rows())?;
            info!("No sites in {}, wrote {}", table.data_type(), path.display());
            return Ok(vec![path]);
        }

        let stems = file_stems(&groups)?;
        let written = groups
            .par_iter()
            .zip(stems.par_iter())
            .map(|((_, rows), stem)| {
                let path = output_dir.join(partition_file_name(stem, table.data_type()));
                let count = self.writer.write(&path, rows.iter().copied())?;
                debug!("Wrote {} rows to {}", count, path.display());
                Ok(path)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Partitioned {} rows of {} into {} site files",
            table.len(),
            table.data_type(),
            written.len()
        );
        Ok(written)
    }
}

/// File-name stem per site group. Sites whose names only differ in path
/// separators would share a file, so each of them gets its first zone id
/// appended.
fn file_stems(groups: &[(String, Vec<&ZonalStatRecord>)]) -> Result<Vec<String>> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (site, _) in groups {
        *counts.entry(sanitize_component(site)).or_default() += 1;
    }

    let stems: Vec<String> = groups
        .iter()
        .map(|(site, rows)| {
            if counts[&sanitize_component(site)] > 1 {
                let ident = rows.first().map(|r| r.ident).unwrap_or_default();
                warn!(
                    "Site '{}' shares a file name with another site, writing it as '{}_{}'",
                    site, site, ident
                );
                format!("{}_{}", site, ident)
            } else {
                site.clone()
            }
        })
        .collect();

    let mut seen = HashSet::new();
    if let Some(stem) = stems.iter().find(|stem| !seen.insert(sanitize_component(stem))) {
        return Err(ProcessingError::InvalidFormat(format!(
            "Site file name '{}' is not unique",
            sanitize_component(stem)
        )));
    }
    Ok(stems)
}
