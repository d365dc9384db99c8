//! Raster fixtures shared by the integration tests.

use ndarray::Array2;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use zonal_processor::readers::GeoTransform;
use zonal_processor::utils::{TAG_GDAL_NODATA, TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT};

/// Write a north-up Float32 GeoTIFF of `value` over x 0..4, y 0..4, with
/// -1 recorded as GDAL_NODATA.
pub fn write_image(path: &Path, value: f64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let data = Array2::from_elem((4, 4), value);
    write_geotiff(path, &data, &GeoTransform::north_up(0.0, 4.0, 1.0), -1.0);
}

pub fn write_geotiff(path: &Path, data: &Array2<f64>, transform: &GeoTransform, nodata: f64) {
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
    let text = nodata.to_string();
    image
        .encoder()
        .write_tag(Tag::Unknown(TAG_GDAL_NODATA), text.as_str())
        .unwrap();
    image.write_data(&pixels).unwrap();
}
