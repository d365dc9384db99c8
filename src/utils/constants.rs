/// GeoTIFF georeferencing tags
pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub const TAG_GDAL_NODATA: u16 = 42113;

/// Zone attribute names
pub const UID_FIELD: &str = "uid";
pub const SITE_NAME_FIELD: &str = "site_name";

/// File and directory names
pub const DEFAULT_EXTENSION: &str = ".tif";
pub const ZONES_FILE_NAME: &str = "all_sites_zones.geojson";
pub const PARTITION_SUFFIX: &str = "zonal_stats";
pub const MANIFEST_SUFFIX: &str = "image_list.csv";
pub const EXPORT_DIR_PREFIX: &str = "zonal_stats";
pub const EMPTY_SITE_PLACEHOLDER: &str = "no_site";

/// Processing defaults
pub const DEFAULT_NODATA: f64 = -1.0;
pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
