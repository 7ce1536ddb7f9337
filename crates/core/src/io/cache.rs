//! Binary native cache for rasters
//!
//! A simply-structured on-disk format for stashing a raster view between
//! pipeline stages without going through TIFF. Little-endian, fields in
//! order: view_height (i32), view_width (i32), view_xoff (i32), view_yoff
//! (i32), num_data_cells (u32), no_data (T), geotransform (6x f64),
//! projection_size (u64), projection bytes, cell data (row-major).
//!
//! With the `cache-compression` feature the whole stream is zlib-compressed.
//! There is no in-band marker: the writer and the loader must agree on the
//! feature at build time. Round-trips are bit-exact either way.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Cell types the cache can store with an exact binary representation.
pub trait CacheElement: RasterElement {
    fn write_value<W: Write>(self, w: &mut W) -> std::io::Result<()>;
    fn read_value<R: Read>(r: &mut R) -> std::io::Result<Self>;
}

impl CacheElement for f32 {
    fn write_value<W: Write>(self, w: &mut W) -> std::io::Result<()> {
        w.write_f32::<LittleEndian>(self)
    }
    fn read_value<R: Read>(r: &mut R) -> std::io::Result<Self> {
        r.read_f32::<LittleEndian>()
    }
}

impl CacheElement for f64 {
    fn write_value<W: Write>(self, w: &mut W) -> std::io::Result<()> {
        w.write_f64::<LittleEndian>(self)
    }
    fn read_value<R: Read>(r: &mut R) -> std::io::Result<Self> {
        r.read_f64::<LittleEndian>()
    }
}

impl CacheElement for i32 {
    fn write_value<W: Write>(self, w: &mut W) -> std::io::Result<()> {
        w.write_i32::<LittleEndian>(self)
    }
    fn read_value<R: Read>(r: &mut R) -> std::io::Result<Self> {
        r.read_i32::<LittleEndian>()
    }
}

impl CacheElement for u32 {
    fn write_value<W: Write>(self, w: &mut W) -> std::io::Result<()> {
        w.write_u32::<LittleEndian>(self)
    }
    fn read_value<R: Read>(r: &mut R) -> std::io::Result<Self> {
        r.read_u32::<LittleEndian>()
    }
}

impl CacheElement for u8 {
    fn write_value<W: Write>(self, w: &mut W) -> std::io::Result<()> {
        w.write_u8(self)
    }
    fn read_value<R: Read>(r: &mut R) -> std::io::Result<Self> {
        r.read_u8()
    }
}

/// Save a raster view to the native cache format.
pub fn save_cache<T: CacheElement, P: AsRef<Path>>(raster: &Raster<T>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;

    #[cfg(feature = "cache-compression")]
    {
        let mut out =
            flate2::write::ZlibEncoder::new(BufWriter::new(file), flate2::Compression::default());
        write_payload(raster, &mut out)?;
        out.finish()?.flush()?;
    }

    #[cfg(not(feature = "cache-compression"))]
    {
        let mut out = BufWriter::new(file);
        write_payload(raster, &mut out)?;
        out.flush()?;
    }

    Ok(())
}

/// Load a raster view from the native cache format.
pub fn load_cache<T: CacheElement, P: AsRef<Path>>(path: P) -> Result<Raster<T>> {
    let file = File::open(path.as_ref())?;

    #[cfg(feature = "cache-compression")]
    {
        let mut input = flate2::read::ZlibDecoder::new(BufReader::new(file));
        read_payload(&mut input)
    }

    #[cfg(not(feature = "cache-compression"))]
    {
        let mut input = BufReader::new(file);
        read_payload(&mut input)
    }
}

fn write_payload<T: CacheElement, W: Write>(raster: &Raster<T>, out: &mut W) -> Result<()> {
    let nodata = raster.nodata().ok_or(Error::NoDataNotSet)?;
    let (rows, cols) = raster.shape();

    let height = to_i32(rows, "view_height")?;
    let width = to_i32(cols, "view_width")?;
    let xoff = to_i32(raster.xoff(), "view_xoff")?;
    let yoff = to_i32(raster.yoff(), "view_yoff")?;
    let num_data_cells: u32 = raster
        .num_data_cells()
        .try_into()
        .map_err(|_| Error::InvalidDimensions { width: cols, height: rows })?;

    out.write_i32::<LittleEndian>(height)?;
    out.write_i32::<LittleEndian>(width)?;
    out.write_i32::<LittleEndian>(xoff)?;
    out.write_i32::<LittleEndian>(yoff)?;
    out.write_u32::<LittleEndian>(num_data_cells)?;
    nodata.write_value(out)?;

    for coeff in raster.transform().to_gdal() {
        out.write_f64::<LittleEndian>(coeff)?;
    }

    let projection = raster.crs().map(|c| c.identifier()).unwrap_or_default();
    out.write_u64::<LittleEndian>(projection.len() as u64)?;
    out.write_all(projection.as_bytes())?;

    for &value in raster.data().iter() {
        value.write_value(out)?;
    }

    Ok(())
}

fn read_payload<T: CacheElement, R: Read>(input: &mut R) -> Result<Raster<T>> {
    let height = input.read_i32::<LittleEndian>()?;
    let width = input.read_i32::<LittleEndian>()?;
    let xoff = input.read_i32::<LittleEndian>()?;
    let yoff = input.read_i32::<LittleEndian>()?;
    let num_data_cells = input.read_u32::<LittleEndian>()?;

    if height < 0 || width < 0 || xoff < 0 || yoff < 0 {
        return Err(Error::InvalidDimensions {
            width: width.max(0) as usize,
            height: height.max(0) as usize,
        });
    }
    let rows = height as usize;
    let cols = width as usize;

    let nodata = T::read_value(input)?;

    let mut coeffs = [0.0_f64; 6];
    for coeff in coeffs.iter_mut() {
        *coeff = input.read_f64::<LittleEndian>()?;
    }

    let projection_size = input.read_u64::<LittleEndian>()? as usize;
    let mut projection = vec![0_u8; projection_size];
    input.read_exact(&mut projection)?;
    let projection = String::from_utf8(projection)
        .map_err(|e| Error::Other(format!("Cache projection is not UTF-8: {}", e)))?;

    let mut data = Vec::with_capacity(rows * cols);
    for _ in 0..rows * cols {
        data.push(T::read_value(input)?);
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_transform(GeoTransform::from_gdal(coeffs));
    raster.set_nodata(Some(nodata));
    raster.set_crs(if projection.is_empty() {
        None
    } else {
        Some(CRS::from_wkt(projection))
    });
    raster.set_view_offset(xoff as usize, yoff as usize);

    if raster.num_data_cells() != num_data_cells as usize {
        return Err(Error::Invariant(format!(
            "cache header claims {} data cells, payload has {}",
            num_data_cells,
            raster.num_data_cells()
        )));
    }

    Ok(raster)
}

fn to_i32(value: usize, name: &'static str) -> Result<i32> {
    value.try_into().map_err(|_| Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: "does not fit the cache header field".to_string(),
    })
}
