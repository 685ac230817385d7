//! Market data: provider trait, Wallex client, request throttling, CSV import.

pub mod csv_import;
pub mod provider;
pub mod throttle;
pub mod wallex;

pub use csv_import::{load_candles_csv, read_candles_csv};
pub use provider::{
    CandleRequest, DataError, DataSource, FetchResult, MarketDataProvider, Resolution,
};
pub use throttle::RequestThrottle;
pub use wallex::{is_tradable_symbol, WallexConfig, WallexProvider};
