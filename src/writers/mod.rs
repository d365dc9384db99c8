pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::SiteCsvWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
