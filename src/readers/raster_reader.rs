use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    TAG_GDAL_NODATA, TAG_MODEL_PIXEL_SCALE, TAG_MODEL_TIEPOINT, TAG_MODEL_TRANSFORMATION,
};
use geo_types::{Coord, Rect};
use memmap2::Mmap;
use ndarray::Array2;
use std::fs::File;
use std::io::Cursor;
use std::ops::Range;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;

/// Affine pixel-to-world transform in GDAL coefficient order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub origin_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            rotation_x: c[2],
            origin_y: c[3],
            rotation_y: c[4],
            pixel_height: c[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.rotation_x,
            self.origin_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// North-up grid with `pixel_size` square cells and its top-left corner at
    /// `(origin_x, origin_y)`.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self::from_gdal([origin_x, pixel_size, 0.0, origin_y, 0.0, -pixel_size])
    }

    pub fn is_north_up(&self) -> bool {
        self.rotation_x == 0.0 && self.rotation_y == 0.0
    }

    /// Footprint of the cell at `(row, col)`.
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect<f64> {
        let x0 = self.origin_x + col as f64 * self.pixel_width;
        let y0 = self.origin_y + row as f64 * self.pixel_height;
        Rect::new((x0, y0), (x0 + self.pixel_width, y0 + self.pixel_height))
    }

    /// Fractional (row, col) of a world coordinate.
    fn fractional_cell(&self, p: Coord<f64>) -> (f64, f64) {
        (
            (p.y - self.origin_y) / self.pixel_height,
            (p.x - self.origin_x) / self.pixel_width,
        )
    }

    /// Cell containing `p`, half-open on the far edges.
    pub fn cell_of(&self, p: Coord<f64>, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let (row, col) = self.fractional_cell(p);
        let (row, col) = (row.floor(), col.floor());
        if row < 0.0 || col < 0.0 || row >= rows as f64 || col >= cols as f64 {
            return None;
        }
        Some((row as usize, col as usize))
    }

    /// Row and column ranges of the cells that can touch `bounds`, clipped to
    /// the grid. `None` when the bounds miss the grid entirely.
    pub fn window(
        &self,
        bounds: &Rect<f64>,
        rows: usize,
        cols: usize,
    ) -> Option<(Range<usize>, Range<usize>)> {
        let (r0, c0) = self.fractional_cell(bounds.min());
        let (r1, c1) = self.fractional_cell(bounds.max());

        let clip = |lo: f64, hi: f64, n: usize| -> Option<Range<usize>> {
            // Cells whose edge coincides with the bound still touch it.
            let start = (lo.min(hi).floor() - 1.0).max(0.0);
            let end = (lo.max(hi).floor() + 1.0).min(n as f64 - 1.0);
            if end < 0.0 || start > n as f64 - 1.0 || start > end {
                return None;
            }
            Some(start as usize..end as usize + 1)
        };

        Some((clip(r0, r1, rows)?, clip(c0, c1, cols)?))
    }
}

/// Band 1 of a raster, held in memory as `f64`, with its transform and the
/// run-level nodata sentinel it was opened with.
#[derive(Debug, Clone)]
pub struct Raster {
    pub data: Array2<f64>,
    pub transform: GeoTransform,
    pub nodata: f64,
    /// Nodata declared by the file itself, if any. Reported, never applied.
    pub file_nodata: Option<f64>,
}

impl Raster {
    pub fn new(data: Array2<f64>, transform: GeoTransform, nodata: f64) -> Self {
        Self {
            data,
            transform,
            nodata,
            file_nodata: None,
        }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_valid(&self, value: f64) -> bool {
        !value.is_nan() && value != self.nodata
    }

    /// Open a single-band GeoTIFF, masking `nodata` in later reads.
    pub fn open(path: &Path, nodata: f64) -> Result<Self> {
        let open_err = |reason: String| ProcessingError::RasterOpen {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| open_err(e.to_string()))?;
        // SAFETY: the mapping is read-only and dropped before this function returns.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| open_err(e.to_string()))?;

        let mut decoder = Decoder::new(Cursor::new(&mmap[..]))
            .map_err(|e| open_err(e.to_string()))?
            .with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions().map_err(|e| open_err(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(open_err("image has no band 1".to_string()));
        }

        let samples = match decoder.colortype().map_err(|e| open_err(e.to_string()))? {
            ColorType::Gray(_) => 1,
            ColorType::GrayA(_) => 2,
            ColorType::RGB(_) => 3,
            ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
            other => return Err(open_err(format!("unsupported sample layout {:?}", other))),
        };

        let transform = read_transform(&mut decoder).map_err(open_err)?;
        if !transform.is_north_up() {
            return Err(open_err("rotated rasters are not supported".to_string()));
        }
        let file_nodata = read_file_nodata(&mut decoder);

        let image = decoder.read_image().map_err(|e| open_err(e.to_string()))?;
        let values = widen(image).ok_or_else(|| open_err("unsupported pixel type".to_string()))?;

        let (rows, cols) = (height as usize, width as usize);
        if values.len() != rows * cols * samples {
            return Err(open_err(format!(
                "decoded {} samples, expected {}",
                values.len(),
                rows * cols * samples
            )));
        }
        let band_one: Vec<f64> = values.into_iter().step_by(samples).collect();
        let data = Array2::from_shape_vec((rows, cols), band_one)
            .map_err(|e| open_err(e.to_string()))?;

        Ok(Self {
            data,
            transform,
            nodata,
            file_nodata,
        })
    }
}

fn find_f64s<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    tag: u16,
) -> std::result::Result<Option<Vec<f64>>, String> {
    decoder
        .find_tag(Tag::from_u16_exhaustive(tag))
        .map_err(|e| e.to_string())?
        .map(|value| value.into_f64_vec().map_err(|e| e.to_string()))
        .transpose()
}

fn read_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> std::result::Result<GeoTransform, String> {
    if let Some(m) = find_f64s(decoder, TAG_MODEL_TRANSFORMATION)? {
        if m.len() < 8 {
            return Err("malformed ModelTransformationTag".to_string());
        }
        return Ok(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
    }

    let scale = find_f64s(decoder, TAG_MODEL_PIXEL_SCALE)?;
    let tiepoint = find_f64s(decoder, TAG_MODEL_TIEPOINT)?;
    match (scale, tiepoint) {
        (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
            let (sx, sy) = (scale[0], scale[1]);
            Ok(GeoTransform::from_gdal([
                tie[3] - tie[0] * sx,
                sx,
                0.0,
                tie[4] + tie[1] * sy,
                0.0,
                -sy,
            ]))
        }
        _ => Err("no georeferencing tags".to_string()),
    }
}

fn read_file_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let value = decoder
        .find_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
        .ok()??;
    let text = value.into_string().ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse::<f64>()
        .ok()
}

#[allow(unreachable_patterns)]
fn widen(image: DecodingResult) -> Option<Vec<f64>> {
    let values = match image {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => return None,
    };
    Some(values)
}
