use crate::error::{ProcessingError, Result};
use crate::models::{DateRule, VariableDefinition, ZonalStatRecord, Zone, ZoneGeometry, ZoneSet};
use crate::processors::statistics::compute_statistics;
use crate::readers::{Raster, ZoneSource};
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

/// Per-image overlay of a zone set on a raster.
#[derive(Debug, Clone, Copy)]
pub struct ZonalStatsEngine {
    nodata: f64,
}

impl ZonalStatsEngine {
    /// `nodata` is the run-level sentinel masked in every image.
    pub fn new(nodata: f64) -> Self {
        Self { nodata }
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    /// Open `image` and the persisted zones at `zone_path` and emit exactly
    /// one record per zone, in zone-source order.
    pub fn compute(
        &self,
        image: &Path,
        zone_path: &Path,
        variable: &VariableDefinition,
        rule: &DateRule,
        data_type: &str,
    ) -> Result<Vec<ZonalStatRecord>> {
        let raster = Raster::open(image, self.nodata)?;
        if let Some(file_nodata) = raster.file_nodata {
            if file_nodata != self.nodata {
                debug!(
                    "{} declares nodata {} ({} missing value {}), masking {}",
                    image.display(),
                    file_nodata,
                    variable.short_code,
                    variable.missing_value,
                    self.nodata
                );
            }
        }

        let zones = ZoneSource::open(zone_path)?;

        let image_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ProcessingError::RasterOpen {
                path: image.to_path_buf(),
                reason: "path has no file name".to_string(),
            })?;
        let date = rule.extract(&image_name)?;

        Ok(self.compute_with(&raster, &zones, &image_name, &date, data_type))
    }

    /// Overlay an already opened raster and zone set. Statistics and zone
    /// attributes come from the same iteration, so row `i` always describes
    /// zone `i`.
    pub fn compute_with(
        &self,
        raster: &Raster,
        zones: &ZoneSet,
        image_name: &str,
        date: &str,
        data_type: &str,
    ) -> Vec<ZonalStatRecord> {
        zones
            .zones()
            .par_iter()
            .map(|zone| {
                let mut values = touched_values(raster, zone);
                ZonalStatRecord {
                    ident: zone.uid,
                    site: zone.site_name.clone(),
                    im_date: date.to_string(),
                    stats: compute_statistics(&mut values),
                    im_name: image_name.to_string(),
                    d_type: data_type.to_string(),
                }
            })
            .collect()
    }
}

/// Valid values of every cell the zone touches. Empty when the zone misses
/// the raster.
pub fn touched_values(raster: &Raster, zone: &Zone) -> Vec<f64> {
    let (rows, cols) = (raster.rows(), raster.cols());
    let transform = &raster.transform;

    match &zone.geometry {
        ZoneGeometry::Point(p) => transform
            .cell_of(p.0, rows, cols)
            .map(|cell| raster.data[cell])
            .filter(|v| raster.is_valid(*v))
            .into_iter()
            .collect(),
        ZoneGeometry::Polygons(_) => {
            let Some(bounds) = zone.geometry.bounds() else {
                return Vec::new();
            };
            let Some((row_range, col_range)) = transform.window(&bounds, rows, cols) else {
                return Vec::new();
            };

            let mut values = Vec::new();
            for row in row_range {
                for col in col_range.clone() {
                    let value = raster.data[[row, col]];
                    if !raster.is_valid(value) {
                        continue;
                    }
                    let cell = transform.cell_rect(row, col);
                    if zone.geometry.touches(&cell) {
                        values.push(value);
                    }
                }
            }
            values
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NamingClass;
    use crate::readers::GeoTransform;
    use geo_types::{polygon, MultiPolygon, Point};
    use ndarray::Array2;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> ZoneGeometry {
        ZoneGeometry::Polygons(MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
        ]]))
    }

    /// 4x4 grid over x 0..4, y 0..4 holding 1..16 row-major, one nodata cell.
    fn raster() -> Raster {
        let mut data = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c + 1) as f64);
        data[[0, 0]] = -1.0;
        Raster::new(data, GeoTransform::north_up(0.0, 4.0, 1.0), -1.0)
    }

    #[test]
    fn test_all_touched_includes_partial_cells() {
        // Covers the centre of cell (1,1) and clips cells (1,2), (2,1), (2,2).
        let zone = Zone::new(1, "A", square(1.2, 1.8, 2.1, 2.9));
        let mut values = touched_values(&raster(), &zone);
        values.sort_by(f64::total_cmp);
        assert_eq!(values, vec![6.0, 7.0, 10.0, 11.0]);
    }

    #[test]
    fn test_nodata_cells_are_excluded() {
        let zone = Zone::new(1, "A", square(0.2, 3.2, 0.8, 3.8));
        assert!(touched_values(&raster(), &zone).is_empty());
    }

    #[test]
    fn test_point_zone_uses_containing_cell() {
        let zone = Zone::new(1, "A", ZoneGeometry::Point(Point::new(2.5, 0.5)));
        assert_eq!(touched_values(&raster(), &zone), vec![15.0]);
    }

    #[test]
    fn test_one_record_per_zone_even_outside_extent() {
        let zones = ZoneSet::new(vec![
            Zone::new(3, "inside", square(1.2, 1.2, 1.8, 1.8)),
            Zone::new(1, "outside", square(40.0, 40.0, 41.0, 41.0)),
        ])
        .unwrap();

        let engine = ZonalStatsEngine::new(-1.0);
        let records = engine.compute_with(&raster(), &zones, "r_202001cor.tif", "202001", "rain_cor");

        assert_eq!(records.len(), 2);
        assert_eq!((records[0].ident, records[0].site.as_str()), (3, "inside"));
        assert_eq!(records[0].mean(), Some(10.0));
        assert_eq!((records[1].ident, records[1].site.as_str()), (1, "outside"));
        assert_eq!(records[1].stats.count, 0);
        assert_eq!(records[1].mean(), None);
    }

    #[test]
    fn test_compute_reports_bad_date_token() {
        use crate::readers::fixtures::write_geotiff;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let image = dir.path().join("rain_20x001cor.tif");
        let data = Array2::from_elem((2, 2), 5.0);
        write_geotiff(&image, &data, &GeoTransform::north_up(0.0, 2.0, 1.0), None);

        let zones = ZoneSet::new(vec![Zone::new(1, "A", square(0.2, 0.2, 0.8, 0.8))]).unwrap();
        let zone_path = dir.path().join("zones.geojson");
        ZoneSource::persist(&zones, &zone_path).unwrap();

        let variable = VariableDefinition::new("mm", "rain_m", 0.1, -32767.0, 3276.5);
        let result = ZonalStatsEngine::new(-1.0).compute(
            &image,
            &zone_path,
            &variable,
            &NamingClass::Cor.default_rule(),
            "rain_cor",
        );
        assert!(matches!(result, Err(ProcessingError::DateParse { .. })));
    }
}
