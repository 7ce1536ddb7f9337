//! I/O operations for reading and writing raster data

mod cache;
mod geotiff;

pub use cache::{load_cache, save_cache, CacheElement};
pub use geotiff::{dem_metadata, read_dem, read_dem_window, write_dem, DemMetadata};
