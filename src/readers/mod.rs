pub mod raster_reader;
pub mod zone_source;

#[cfg(test)]
pub(crate) mod fixtures;

pub use raster_reader::{GeoTransform, Raster};
pub use zone_source::ZoneSource;
