//! CSV candle import for offline analysis.
//!
//! Expected header: `timestamp,open,high,low,close`, timestamp in unix seconds.
//! Extra columns (e.g. volume) are ignored.

use super::provider::{DataError, DataSource, FetchResult};
use crate::domain::Candle;
use chrono::DateTime;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Read candles from a CSV file. The symbol is the file stem.
pub fn load_candles_csv(path: &Path) -> Result<FetchResult, DataError> {
    let file = std::fs::File::open(path)?;
    let symbol = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "CSV".to_string());
    Ok(FetchResult {
        symbol,
        candles: read_candles_csv(file)?,
        source: DataSource::CsvImport,
    })
}

/// Read candles from any CSV source. Rows are returned in file order; the
/// engine rejects unordered timestamps.
pub fn read_candles_csv<R: Read>(reader: R) -> Result<Vec<Candle>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    rdr.deserialize::<CsvRow>()
        .enumerate()
        .map(|(i, row)| -> Result<Candle, DataError> {
            let row = row?;
            let timestamp = DateTime::from_timestamp(row.timestamp, 0).ok_or_else(|| {
                DataError::Other(format!("row {}: invalid timestamp {}", i + 1, row.timestamp))
            })?;
            Ok(Candle::new(timestamp, row.open, row.high, row.low, row.close))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_rows_in_order() {
        let data = "timestamp,open,high,low,close,volume\n\
                    1700000000,100,101,99,100.5,10\n\
                    1700003600, 100.5 ,102,100,101.5,12\n";
        let candles = read_candles_csv(data.as_bytes()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(candles[1].open, 100.5);
        assert_eq!(candles[1].close, 101.5);
    }

    #[test]
    fn nan_cells_pass_through_for_engine_validation() {
        let data = "timestamp,open,high,low,close\n1700000000,NaN,101,99,100\n";
        let candles = read_candles_csv(data.as_bytes()).unwrap();
        assert!(candles[0].open.is_nan());
    }

    #[test]
    fn rejects_missing_column() {
        let data = "timestamp,open,high,low\n1700000000,100,101,99\n";
        assert!(matches!(
            read_candles_csv(data.as_bytes()),
            Err(DataError::Csv(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTCUSDT.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "timestamp,open,high,low,close").unwrap();
        writeln!(file, "1700000000,1,2,0.5,1.5").unwrap();
        drop(file);

        let fetched = load_candles_csv(&path).unwrap();
        assert_eq!(fetched.symbol, "BTCUSDT");
        assert_eq!(fetched.source, DataSource::CsvImport);
        assert_eq!(fetched.candles.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_candles_csv(Path::new("/nonexistent/candles.csv")),
            Err(DataError::Io(_))
        ));
    }
}
