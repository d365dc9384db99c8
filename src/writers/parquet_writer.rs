use crate::error::{ProcessingError, Result};
use crate::models::{Statistic, ZonalStatRecord, ZonalStatsTable};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Columnar export of a whole zonal statistics table, one row per record
/// and one nullable column per statistic.
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write every row of `table` to `path`. An empty table still produces a
    /// file with the schema and no rows.
    pub fn write_table(&self, table: &ZonalStatsTable, path: &Path) -> Result<()> {
        let schema = Self::create_schema();
        let batch = Self::records_to_batch(table.rows(), schema.clone())?;

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let reader = SerializedFileReader::new(File::open(path)?)?;
        let metadata = reader.metadata();

        Ok(ParquetFileInfo {
            total_rows: metadata.file_metadata().num_rows(),
            row_groups: metadata.num_row_groups() as i32,
            file_size: std::fs::metadata(path)?.len(),
            compression: self.compression,
        })
    }

    fn create_schema() -> Arc<Schema> {
        let mut fields = vec![
            Field::new("ident", DataType::UInt32, false),
            Field::new("site", DataType::Utf8, false),
            Field::new("im_date", DataType::Utf8, false),
            Field::new("count", DataType::UInt64, false),
        ];
        fields.extend(
            Statistic::ALL
                .into_iter()
                .filter(|s| *s != Statistic::Count)
                .map(|s| Field::new(s.column_suffix(), DataType::Float64, true)),
        );
        fields.push(Field::new("im_name", DataType::Utf8, false));
        fields.push(Field::new("d_type", DataType::Utf8, false));
        Arc::new(Schema::new(fields))
    }

    fn records_to_batch(records: &[ZonalStatRecord], schema: Arc<Schema>) -> Result<RecordBatch> {
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(UInt32Array::from(
                records.iter().map(|r| r.ident).collect::<Vec<_>>(),
            )),
            string_column(records, |r| r.site.as_str()),
            string_column(records, |r| r.im_date.as_str()),
            Arc::new(UInt64Array::from(
                records.iter().map(|r| r.stats.count as u64).collect::<Vec<_>>(),
            )),
        ];
        for statistic in Statistic::ALL.into_iter().filter(|s| *s != Statistic::Count) {
            columns.push(Arc::new(Float64Array::from(
                records
                    .iter()
                    .map(|r| r.stats.get(statistic))
                    .collect::<Vec<_>>(),
            )));
        }
        columns.push(string_column(records, |r| r.im_name.as_str()));
        columns.push(string_column(records, |r| r.d_type.as_str()));

        Ok(RecordBatch::try_new(schema, columns)?)
    }
}

fn string_column(records: &[ZonalStatRecord], field: fn(&ZonalStatRecord) -> &str) -> ArrayRef {
    Arc::new(StringArray::from(
        records.iter().map(field).collect::<Vec<&str>>(),
    ))
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub file_size: u64,
    pub compression: Compression,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneStatistics;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::NamedTempFile;

    fn table() -> ZonalStatsTable {
        let row = |ident: u32, mean: Option<f64>| ZonalStatRecord {
            ident,
            site: "ALI01".to_string(),
            im_date: "202001".to_string(),
            stats: ZoneStatistics {
                count: if mean.is_some() { 3 } else { 0 },
                mean,
                ..ZoneStatistics::default()
            },
            im_name: "rain_202001cor.tif".to_string(),
            d_type: String::new(),
        };
        ZonalStatsTable::new("rain_cor", vec![row(1, Some(2.5)), row(2, None)])
    }

    #[test]
    fn test_write_table_keeps_missing_as_null() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new().unwrap();
        writer.write_table(&table(), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 2);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(temp_file.path())?)?
            .build()?;
        let batch = reader.into_iter().next().unwrap()?;
        let mean = batch
            .column_by_name("mean")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(mean.value(0), 2.5);
        assert!(mean.is_null(1));
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new().unwrap();
            writer.write_table(&table(), temp_file.path())?;
            assert!(std::fs::metadata(temp_file.path())?.len() > 0);
        }
        Ok(())
    }

    #[test]
    fn test_invalid_compression() {
        assert!(ParquetWriter::new().with_compression("brotli9").is_err());
    }
}
