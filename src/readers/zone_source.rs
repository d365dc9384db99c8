use crate::error::{ProcessingError, Result};
use crate::models::{Zone, ZoneGeometry, ZoneSet};
use crate::utils::constants::{SITE_NAME_FIELD, UID_FIELD};
use geo_types::{MultiPolygon, Point, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Persisted zone vector source: a GeoJSON FeatureCollection whose features
/// carry `uid` and `site_name` properties, already in the raster CRS.
pub struct ZoneSource;

impl ZoneSource {
    /// Open and fully read the source. Feature order becomes zone order.
    pub fn open(path: &Path) -> Result<ZoneSet> {
        let vector_err = |reason: String| ProcessingError::VectorOpen {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| vector_err(e.to_string()))?;
        let geojson: GeoJson =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| vector_err(e.to_string()))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            _ => return Err(vector_err("expected a FeatureCollection".to_string())),
        };

        let mut zones = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            let empty = JsonObject::new();
            let properties = feature.properties.as_ref().unwrap_or(&empty);
            let uid = Self::read_uid(path, index, properties)?;
            let site_name = Self::read_site_name(path, index, properties)?;
            let geometry = feature
                .geometry
                .ok_or_else(|| vector_err(format!("feature {} has no geometry", index)))
                .and_then(|g| Self::convert_geometry(g.value).map_err(vector_err))?;
            zones.push(Zone::new(uid, site_name, geometry));
        }

        if let Some(uid) = ZoneSet::duplicate_uid(&zones) {
            return Err(ProcessingError::Schema {
                path: path.to_path_buf(),
                field: UID_FIELD.to_string(),
                detail: format!("uid {} is not unique", uid),
            });
        }

        ZoneSet::new(zones)
    }

    /// Write a zone set in the form `open` reads back.
    pub fn persist(zones: &ZoneSet, path: &Path) -> Result<()> {
        let features = zones
            .iter()
            .map(|zone| {
                let mut properties = JsonObject::new();
                properties.insert(UID_FIELD.to_string(), zone.uid.into());
                properties.insert(SITE_NAME_FIELD.to_string(), zone.site_name.clone().into());
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Self::to_geojson(&zone.geometry))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let collection = GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        });

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &collection)?;
        writer.flush()?;
        Ok(())
    }

    fn read_uid(path: &Path, index: usize, properties: &JsonObject) -> Result<u32> {
        let schema_err = |detail: String| ProcessingError::Schema {
            path: path.to_path_buf(),
            field: UID_FIELD.to_string(),
            detail,
        };

        let value = properties
            .get(UID_FIELD)
            .ok_or_else(|| schema_err(format!("feature {} has no uid", index)))?;

        // Shapefile-derived data often stores integers as whole floats.
        let uid = value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| schema_err(format!("feature {} uid {} is not an integer", index, value)))?;

        if uid == 0 || uid > u32::MAX as u64 {
            return Err(schema_err(format!(
                "feature {} uid {} is not a positive 32-bit integer",
                index, uid
            )));
        }
        Ok(uid as u32)
    }

    fn read_site_name(path: &Path, index: usize, properties: &JsonObject) -> Result<String> {
        match properties.get(SITE_NAME_FIELD) {
            Some(serde_json::Value::String(name)) => Ok(name.clone()),
            Some(other) => Err(ProcessingError::Schema {
                path: path.to_path_buf(),
                field: SITE_NAME_FIELD.to_string(),
                detail: format!("feature {} site_name {} is not a string", index, other),
            }),
            None => Err(ProcessingError::Schema {
                path: path.to_path_buf(),
                field: SITE_NAME_FIELD.to_string(),
                detail: format!("feature {} has no site_name", index),
            }),
        }
    }

    fn convert_geometry(value: Value) -> std::result::Result<ZoneGeometry, String> {
        if let Some(position) = Self::short_position(&value) {
            return Err(format!("position {:?} has fewer than two ordinates", position));
        }
        let geometry = match value {
            Value::Point(_) => ZoneGeometry::Point(Point::try_from(value).map_err(|e| e.to_string())?),
            Value::Polygon(_) => ZoneGeometry::Polygons(MultiPolygon::new(vec![
                Polygon::try_from(value).map_err(|e| e.to_string())?,
            ])),
            Value::MultiPolygon(_) => {
                ZoneGeometry::Polygons(MultiPolygon::try_from(value).map_err(|e| e.to_string())?)
            }
            _ => return Err("only Point, Polygon and MultiPolygon zones are supported".to_string()),
        };
        Ok(geometry)
    }

    /// First position with fewer than two ordinates, if any.
    fn short_position(value: &Value) -> Option<&Vec<f64>> {
        let short = |p: &&Vec<f64>| p.len() < 2;
        match value {
            Value::Point(p) => Some(p).filter(short),
            Value::Polygon(rings) => rings.iter().flatten().find(short),
            Value::MultiPolygon(polygons) => polygons.iter().flatten().flatten().find(short),
            _ => None,
        }
    }

    fn to_geojson(geometry: &ZoneGeometry) -> Value {
        match geometry {
            ZoneGeometry::Point(point) => Value::from(point),
            ZoneGeometry::Polygons(polygons) if polygons.0.len() == 1 => Value::from(&polygons.0[0]),
            ZoneGeometry::Polygons(polygons) => Value::from(polygons),
        }
    }
}
