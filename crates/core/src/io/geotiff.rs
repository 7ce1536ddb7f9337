//! Single-band Float32 GeoTIFF reading/writing
//!
//! Uses the `tiff` crate directly; no GDAL dependency. The DEM pipeline
//! accepts exactly one layout: a single-band 32-bit float raster with a
//! defined NoData value and a north-up geotransform. Anything else is
//! rejected up front rather than half-read.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use ndarray::s;
use std::fs::File;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tiff::ColorType;

const TAG_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const TAG_TIEPOINT: Tag = Tag::ModelTiepointTag;
/// Used to carry the projection string
const TAG_GEO_ASCII: Tag = Tag::GeoAsciiParamsTag;
/// ASCII-encoded no-data value
const TAG_GDAL_NODATA: Tag = Tag::GdalNodata;

/// Header of a DEM file: everything except the cell data.
#[derive(Debug, Clone)]
pub struct DemMetadata {
    pub rows: usize,
    pub cols: usize,
    pub nodata: f32,
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
}

/// Read the header of a DEM without loading cell data.
pub fn dem_metadata<P: AsRef<Path>>(path: P) -> Result<DemMetadata> {
    let mut decoder = open(path.as_ref())?;
    read_header(&mut decoder)
}

/// Read a complete DEM into a raster.
pub fn read_dem<P: AsRef<Path>>(path: P) -> Result<Raster<f32>> {
    let mut decoder = open(path.as_ref())?;
    let header = read_header(&mut decoder)?;

    match decoder.colortype() {
        Ok(ColorType::Gray(_)) => {}
        _ => {
            return Err(Error::UnsupportedDataType(
                "expected a single-band raster".to_string(),
            ))
        }
    }

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<f32> = match result {
        DecodingResult::F32(buf) => buf,
        other => {
            return Err(Error::UnsupportedDataType(format!(
                "expected Float32 samples, got {}",
                decoding_result_name(&other)
            )))
        }
    };

    if data.len() != header.rows * header.cols {
        return Err(Error::InvalidDimensions {
            width: header.cols,
            height: header.rows,
        });
    }

    let mut raster = Raster::from_vec(data, header.rows, header.cols)?;
    raster.set_transform(header.transform);
    raster.set_nodata(Some(header.nodata));
    raster.set_crs(header.crs);

    Ok(raster)
}

/// Read a horizontal band of rows `[first_row, first_row + row_count)`.
///
/// The returned raster keeps the parent geotransform and records the window
/// position in its view anchor, so saving it later shifts the origin to the
/// right place.
pub fn read_dem_window<P: AsRef<Path>>(
    path: P,
    first_row: usize,
    row_count: usize,
) -> Result<Raster<f32>> {
    let full = read_dem(path)?;
    let (rows, cols) = full.shape();

    if row_count == 0 {
        return Err(Error::InvalidParameter {
            name: "row_count",
            value: "0".to_string(),
            reason: "window must contain at least one row".to_string(),
        });
    }
    if first_row + row_count > rows {
        return Err(Error::IndexOutOfBounds {
            row: first_row + row_count - 1,
            col: 0,
            rows,
            cols,
        });
    }

    let window = full
        .data()
        .slice(s![first_row..first_row + row_count, ..])
        .to_owned();

    let mut raster = Raster::from_array(window);
    raster.set_transform(*full.transform());
    raster.set_nodata(full.nodata());
    raster.set_crs(full.crs().cloned());
    raster.set_view_offset(0, first_row);

    Ok(raster)
}

/// Write a raster as a single-band Float32 GeoTIFF.
///
/// The view anchor is applied to the geotransform, so a strip raster lands
/// at its true georeferenced position. NoData must be set.
pub fn write_dem<P: AsRef<Path>>(raster: &Raster<f32>, path: P) -> Result<()> {
    let nodata = raster.nodata().ok_or(Error::NoDataNotSet)?;

    let file = File::create(path.as_ref())?;
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let gt = raster.shifted_transform();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    // ModelPixelScaleTag
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(TAG_PIXEL_SCALE, &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    // ModelTiepointTag
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(TAG_TIEPOINT, &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // GDAL_NODATA: ASCII-encoded, round-trips through the shortest
    // representation that parses back to the same bits
    let nd = format!("{}", nodata);
    image
        .encoder()
        .write_tag(TAG_GDAL_NODATA, nd.as_str())
        .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;

    if let Some(crs) = raster.crs() {
        let projection = format!("{}|", crs.identifier());
        image
            .encoder()
            .write_tag(TAG_GEO_ASCII, projection.as_str())
            .map_err(|e| Error::Other(format!("Cannot write projection tag: {}", e)))?;
    }

    let data: Vec<f32> = raster.data().iter().copied().collect();
    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

fn open(path: &Path) -> Result<Decoder<File>> {
    let file = File::open(path)?;
    Decoder::new(file).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))
}

fn read_header(decoder: &mut Decoder<File>) -> Result<DemMetadata> {
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let transform = read_geotransform(decoder)?;
    let nodata = read_nodata(decoder)?;
    let crs = read_projection(decoder);

    Ok(DemMetadata {
        rows: height as usize,
        cols: width as usize,
        nodata,
        transform,
        crs,
    })
}

/// Read GeoTransform from ModelPixelScaleTag + ModelTiepointTag.
fn read_geotransform(decoder: &mut Decoder<File>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(TAG_PIXEL_SCALE)
        .map_err(|_| Error::MissingGeotransform)?;

    let tiepoint = decoder
        .get_tag_f64_vec(TAG_TIEPOINT)
        .map_err(|_| Error::MissingGeotransform)?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(Error::MissingGeotransform);
    }

    // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    let pixel_width = scale[0];
    let pixel_height = -scale[1]; // Negative for north-up

    Ok(GeoTransform::new(origin_x, origin_y, pixel_width, pixel_height))
}

fn read_nodata(decoder: &mut Decoder<File>) -> Result<f32> {
    let text = decoder
        .get_tag_ascii_string(TAG_GDAL_NODATA)
        .map_err(|_| Error::NoDataNotSet)?;

    text.trim().trim_end_matches('\0').trim().parse::<f32>().map_err(|_| {
        Error::UnsupportedDataType(format!("unparseable NoData value: {:?}", text))
    })
}

fn read_projection(decoder: &mut Decoder<File>) -> Option<CRS> {
    let text = decoder
        .get_tag_ascii_string(TAG_GEO_ASCII)
        .ok()?;
    let trimmed = text.trim_end_matches('\0').trim_end_matches('|');
    if trimmed.is_empty() {
        None
    } else {
        Some(CRS::from_wkt(trimmed))
    }
}

fn decoding_result_name(result: &DecodingResult) -> &'static str {
    match result {
        DecodingResult::U8(_) => "U8",
        DecodingResult::U16(_) => "U16",
        DecodingResult::U32(_) => "U32",
        DecodingResult::U64(_) => "U64",
        DecodingResult::I8(_) => "I8",
        DecodingResult::I16(_) => "I16",
        DecodingResult::I32(_) => "I32",
        DecodingResult::I64(_) => "I64",
        DecodingResult::F32(_) => "F32",
        DecodingResult::F64(_) => "F64",
    }
}
