//! GeoTIFF fixtures for reader and engine tests.

use crate::readers::GeoTransform;
use crate::utils::constants::{TAG_GDAL_NODATA, TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT};
use ndarray::Array2;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Single-band Float32 GeoTIFF with tie-point georeferencing and an optional
/// GDAL_NODATA tag.
pub fn write_geotiff(path: &Path, data: &Array2<f64>, transform: &GeoTransform, nodata: Option<f64>) {
    let (rows, cols) = data.dim();
    let pixels: Vec<f32> = data.iter().map(|v| *v as f32).collect();

    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path).unwrap())).unwrap();
    let mut image = encoder
        .new_image::<colortype::Gray32Float>(cols as u32, rows as u32)
        .unwrap();

    let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &scale[..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tiepoint[..])
        .unwrap();
    if let Some(nodata) = nodata {
        let text = nodata.to_string();
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_GDAL_NODATA), text.as_str())
            .unwrap();
    }
    image.write_data(&pixels).unwrap();
}
