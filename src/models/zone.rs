use crate::error::{ProcessingError, Result};
use geo::{BoundingRect, Intersects};
use geo_types::{MultiPolygon, Point, Rect};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum ZoneGeometry {
    Point(Point<f64>),
    Polygons(MultiPolygon<f64>),
}

impl ZoneGeometry {
    pub fn bounds(&self) -> Option<Rect<f64>> {
        match self {
            ZoneGeometry::Point(p) => Some(p.bounding_rect()),
            ZoneGeometry::Polygons(polygons) => polygons.bounding_rect(),
        }
    }

    /// True when the zone shares any point with the closed `cell`, boundary
    /// included. Cells lying wholly inside a hole are not touched.
    pub fn touches(&self, cell: &Rect<f64>) -> bool {
        match self {
            ZoneGeometry::Point(p) => p.intersects(cell),
            ZoneGeometry::Polygons(polygons) => polygons.iter().any(|poly| poly.intersects(cell)),
        }
    }
}

/// One survey site polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub uid: u32,
    pub site_name: String,
    pub geometry: ZoneGeometry,
}

impl Zone {
    pub fn new(uid: u32, site_name: impl Into<String>, geometry: ZoneGeometry) -> Self {
        Self {
            uid,
            site_name: site_name.into(),
            geometry,
        }
    }
}

/// Ordered, read-only collection of zones. Iteration order is the order of
/// the features in the source, and every consumer walks that one order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneSet {
    zones: Vec<Zone>,
}

impl ZoneSet {
    pub fn new(zones: Vec<Zone>) -> Result<Self> {
        if let Some(uid) = Self::duplicate_uid(&zones) {
            return Err(ProcessingError::InvalidFormat(format!(
                "Duplicate zone uid {}",
                uid
            )));
        }
        Ok(Self { zones })
    }

    pub fn duplicate_uid(zones: &[Zone]) -> Option<u32> {
        let mut seen = HashSet::with_capacity(zones.len());
        zones.iter().map(|z| z.uid).find(|uid| !seen.insert(*uid))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Zone> {
        self.zones.iter()
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Distinct site names in first-appearance order.
    pub fn site_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.zones
            .iter()
            .map(|z| z.site_name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ZoneSet {
    type Item = &'a Zone;
    type IntoIter = std::slice::Iter<'a, Zone>;

    fn into_iter(self) -> Self::IntoIter {
        self.zones.iter()
    }
}
