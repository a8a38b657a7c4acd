use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Known schema of the bus_routes table
// ---------------------------------------------------------------------------

pub const STATE: &str = "state";
pub const ROUTE_NAME: &str = "route_name";
pub const ROUTE_URL: &str = "route_url";
pub const BUSNAME: &str = "busname";
pub const BUSTYPE: &str = "bustype";
pub const DEPARTING_TIME: &str = "departing_time";
pub const DEPARTURE_LOCATION: &str = "departure_location";
pub const REACHING_TIME: &str = "reaching_time";
pub const ARRIVAL_LOCATION: &str = "arrival_location";
pub const STAR_RATING: &str = "star_rating";
pub const PRICE: &str = "price";
pub const SEATS_AVAILABLE: &str = "seats_available";

/// Columns of the bus_routes table, in display order.
pub const BUS_ROUTE_COLUMNS: [&str; 12] = [
    STATE,
    ROUTE_NAME,
    ROUTE_URL,
    BUSNAME,
    BUSTYPE,
    DEPARTING_TIME,
    DEPARTURE_LOCATION,
    REACHING_TIME,
    ARRIVAL_LOCATION,
    STAR_RATING,
    PRICE,
    SEATS_AVAILABLE,
];

/// Trim and lowercase a column name. Every column name that enters a
/// [`Dataset`] or a filter step goes through here.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Candidate sets are `BTreeSet<CellValue>`, so `CellValue` must be `Ord`.
/// A NaN float counts as missing, the same as `Null`.
#[derive(Debug, Clone)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --
// Equality goes through `cmp` so it agrees with the ordering and `Hash`.

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Float(f) if f.is_nan() => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db || da == 0 {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        if self.is_null() {
            return std::mem::discriminant(&CellValue::Null).hash(state);
        }
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    /// NaN becomes `Null`.
    fn from(v: f64) -> Self {
        if v.is_nan() {
            CellValue::Null
        } else {
            CellValue::Float(v)
        }
    }
}

impl CellValue {
    /// Numeric view used by range steps. NaN counts as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if !v.is_nan() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// `Null`, or a NaN float.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }
}

static NULL: CellValue = CellValue::Null;

// ---------------------------------------------------------------------------
// Row – one bus on one route
// ---------------------------------------------------------------------------

/// A single row of the table: normalized column name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<String, CellValue>,
}

impl Row {
    /// Value of `column`; absent cells read as [`CellValue::Null`].
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The loaded table. Column names are normalized on construction and
/// never again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
    /// Normalized column names in order of first appearance.
    columns: Vec<String>,
}

impl Dataset {
    /// Build a dataset from raw records of `(column, value)` pairs.
    ///
    /// Column names are trimmed and lowercased here. If two source columns
    /// collapse to the same name, the later one wins.
    pub fn from_records<I, R, K>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, CellValue)>,
        K: AsRef<str>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();

        for record in records {
            let mut cells = BTreeMap::new();
            for (raw_name, value) in record {
                let name = normalize_column_name(raw_name.as_ref());
                if !columns.contains(&name) {
                    columns.push(name.clone());
                }
                if cells.insert(name.clone(), value).is_some() {
                    log::warn!(
                        "column '{}' appears more than once after normalization; keeping the last value",
                        name
                    );
                }
            }
            rows.push(Row { cells });
        }

        Dataset { rows, columns }
    }

    /// Build a dataset from already-normalized parts. Used for subsets of an
    /// existing dataset, which must keep their schema even when empty.
    fn from_parts(rows: Vec<Row>, columns: Vec<String>) -> Self {
        Dataset { rows, columns }
    }

    /// New dataset holding the rows at `indices`, in the given order.
    /// Out-of-range indices are skipped.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Dataset::from_parts(rows, self.columns.clone())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether the (already normalized) column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Cell at `(row, column)`, `Null` if either is missing.
    pub fn value(&self, row: usize, column: &str) -> &CellValue {
        self.rows.get(row).map(|r| r.get(column)).unwrap_or(&NULL)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
