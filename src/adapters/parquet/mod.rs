//! Parquet adapter: Implementation of PatientSource over the demo dataset.
//!
//! The whole file is read once into memory through the `parquet` row API.
//! Rows are keyed by an identifier column (`patient_nbr` by default).

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use parquet::errors::ParquetError;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;

use crate::ports::{Cell, DatasetRow, PatientId, PatientSource};

/// Default identifier column of the demo dataset.
pub const DEFAULT_ID_COLUMN: &str = "patient_nbr";

/// Error type for dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Dataset not found at {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to open dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Identifier column {0:?} not found in any row")]
    MissingIdColumn(String),

    #[error("Dataset contains no rows")]
    Empty,
}

/// In-memory snapshot of the demo dataset.
#[derive(Debug, Clone)]
pub struct ParquetDataset {
    order: Vec<PatientId>,
    rows: HashMap<PatientId, DatasetRow>,
}

impl ParquetDataset {
    /// Read a Parquet file into memory.
    ///
    /// # Errors
    /// Returns [`DatasetError`] if the file is missing or unreadable, or if no
    /// row carries a usable identifier.
    pub fn load(path: &Path, id_column: &str) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let reader = SerializedFileReader::new(file)?;
        let mut rows = Vec::new();
        for row in reader.get_row_iter(None)? {
            let row = row?;
            let cells = row
                .get_column_iter()
                .map(|(name, field)| (name.clone(), to_cell(field)))
                .collect();
            rows.push(DatasetRow { cells });
        }

        let dataset = Self::from_rows(id_column, rows)?;
        tracing::info!(
            "Loaded dataset from {:?} ({} patients)",
            path,
            dataset.order.len()
        );
        Ok(dataset)
    }

    /// Build a dataset from already-materialized rows.
    ///
    /// Rows without a usable identifier are skipped; for duplicate
    /// identifiers the first row wins.
    ///
    /// # Errors
    /// Returns [`DatasetError`] if nothing usable remains.
    pub fn from_rows(
        id_column: &str,
        rows: impl IntoIterator<Item = DatasetRow>,
    ) -> Result<Self, DatasetError> {
        let mut order = Vec::new();
        let mut by_id = HashMap::new();
        let mut total = 0usize;
        let mut skipped = 0usize;
        let mut saw_column = false;

        for row in rows {
            total += 1;
            let id = match row.get(id_column) {
                Some(cell) => {
                    saw_column = true;
                    patient_id(cell)
                }
                None => None,
            };
            let Some(id) = id else {
                skipped += 1;
                continue;
            };
            if by_id.contains_key(&id) {
                tracing::debug!("Duplicate patient id {id}, keeping first row");
                continue;
            }
            order.push(id);
            by_id.insert(id, row);
        }

        if total == 0 {
            return Err(DatasetError::Empty);
        }
        if !saw_column {
            return Err(DatasetError::MissingIdColumn(id_column.to_string()));
        }
        if skipped > 0 {
            tracing::warn!("Skipped {skipped} of {total} rows without a usable {id_column}");
        }
        if order.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            order,
            rows: by_id,
        })
    }
}

impl PatientSource for ParquetDataset {
    fn patient_ids(&self) -> Vec<PatientId> {
        self.order.clone()
    }

    fn row(&self, id: PatientId) -> Option<&DatasetRow> {
        self.rows.get(&id)
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

fn patient_id(cell: &Cell) -> Option<PatientId> {
    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Float(x) if x.fract() == 0.0 && x.is_finite() => Some(*x as i64),
        Cell::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_cell(field: &Field) -> Cell {
    match field {
        Field::Null => Cell::Null,
        Field::Bool(b) => Cell::Int(i64::from(*b)),
        Field::Byte(v) => Cell::Int(i64::from(*v)),
        Field::Short(v) => Cell::Int(i64::from(*v)),
        Field::Int(v) => Cell::Int(i64::from(*v)),
        Field::Long(v) => Cell::Int(*v),
        Field::UByte(v) => Cell::Int(i64::from(*v)),
        Field::UShort(v) => Cell::Int(i64::from(*v)),
        Field::UInt(v) => Cell::Int(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v).map_or(Cell::Float(*v as f64), Cell::Int),
        Field::Float(v) => Cell::Float(f64::from(*v)),
        Field::Double(v) => Cell::Float(*v),
        Field::Str(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}
