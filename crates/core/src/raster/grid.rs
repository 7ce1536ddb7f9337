//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{neighborhood, GeoTransform, RasterElement};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2};

/// A georeferenced 2D raster grid, optionally a view into a larger raster.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS). The `(xoff, yoff)` anchor
/// records where this grid sits inside its parent raster, so a strip read
/// from a larger file knows its own georeferenced position.
///
/// # Type Parameters
///
/// - `T`: The cell value type, must implement [`RasterElement`]
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation of the parent raster
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value
    nodata: Option<T>,
    /// Column of the parent raster this view starts at
    xoff: usize,
    /// Row of the parent raster this view starts at
    yoff: usize,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from existing data in row-major order
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
            xoff: 0,
            yoff: 0,
        }
    }

    /// Create a raster with the same metadata (including the view anchor)
    /// but a different cell type, filled with zeros.
    pub fn with_same_meta<U: RasterElement>(&self) -> Raster<U> {
        Raster {
            data: Array2::zeros(self.data.dim()),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
            xoff: self.xoff,
            yoff: self.yoff,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
            xoff: self.xoff,
            yoff: self.yoff,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resize the grid, discarding existing data
    pub fn resize(&mut self, rows: usize, cols: usize, fill: T) {
        self.data = Array2::from_elem((rows, cols), fill);
    }

    // View anchor

    /// Column offset of this view inside its parent raster
    pub fn xoff(&self) -> usize {
        self.xoff
    }

    /// Row offset of this view inside its parent raster
    pub fn yoff(&self) -> usize {
        self.yoff
    }

    /// Set the view anchor
    pub fn set_view_offset(&mut self, xoff: usize, yoff: usize) {
        self.xoff = xoff;
        self.yoff = yoff;
    }

    /// Geotransform of this view: the parent transform with the origin moved
    /// to the anchor pixel.
    pub fn shifted_transform(&self) -> GeoTransform {
        self.transform.with_view_offset(self.xoff, self.yoff)
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Set value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn set_unchecked(&mut self, row: usize, col: usize, value: T) {
        unsafe { *self.data.uget_mut((row, col)) = value; }
    }

    /// Get value at a linear index i = row * cols + col
    pub fn get_linear(&self, i: usize) -> Result<T> {
        let cols = self.cols();
        if cols == 0 {
            return Err(Error::IndexOutOfBounds {
                row: 0,
                col: 0,
                rows: self.rows(),
                cols,
            });
        }
        self.get(i / cols, i % cols)
    }

    /// Set value at a linear index i = row * cols + col
    pub fn set_linear(&mut self, i: usize, value: T) -> Result<()> {
        let cols = self.cols();
        if cols == 0 {
            return Err(Error::IndexOutOfBounds {
                row: 0,
                col: 0,
                rows: self.rows(),
                cols,
            });
        }
        self.set(i / cols, i % cols, value)
    }

    /// Translate (row, col) by a D8 offset, staying inside this raster
    pub fn neighbor(&self, row: usize, col: usize, offset: (isize, isize)) -> Option<(usize, usize)> {
        neighborhood::translate(row, col, offset, self.rows(), self.cols())
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    /// Consume the raster and return the underlying array
    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    /// Get a row slice
    pub fn row(&self, row: usize) -> Result<ArrayView1<'_, T>> {
        if row >= self.rows() {
            return Err(Error::IndexOutOfBounds {
                row,
                col: 0,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(self.data.row(row))
    }

    /// Copy a row into an owned vector
    pub fn row_vec(&self, row: usize) -> Result<Vec<T>> {
        Ok(self.row(row)?.to_vec())
    }

    /// Get a column slice
    pub fn column(&self, col: usize) -> Result<ArrayView1<'_, T>> {
        if col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row: 0,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(self.data.column(col))
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Check if cell at (row, col) contains no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    /// Number of cells that are not no-data
    pub fn num_data_cells(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }
}
