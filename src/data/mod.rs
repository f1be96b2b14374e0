pub mod connectors;
pub mod export;
pub mod source;

pub use connectors::{CsvConnector, DataValidator, DatasetMetadata};
pub use export::ForecastExporter;
pub use source::{CsvReturnSource, InMemorySource, ReturnSource, SyntheticGarchSource};
