/// Data layer: core types, loading, filtering and export.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  DataSource::load → Dataset (column names normalized once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<Row>, ordered column list
///   └──────────┘
///        │            FilterChain (owned by the session)
///        ▼                  │
///   ┌──────────┐            │
///   │  filter   │◄──────────┘  left-fold of step predicates → row indices
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  surviving rows → CSV
///   └──────────┘
/// ```

pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;

pub use error::DataError;
pub use filter::{apply, FilterChain, Filtered, StepOutcome};
pub use model::{CellValue, Dataset, Row};
