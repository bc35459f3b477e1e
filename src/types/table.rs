/// Table metadata learned from CREATE statements
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Coarse declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// STRING / VARCHAR / TEXT / JSON / BYTES ...
    String,
    /// INT64 / INTEGER / BIGINT / SERIAL ...
    Int,
    /// FLOAT64 / DOUBLE / NUMERIC ...
    Float,
    /// TIMESTAMP / TIMESTAMPTZ / DATETIME
    Timestamp,
    /// DATE
    Date,
    /// BOOL / BOOLEAN
    Bool,
}

impl ColumnType {
    /// Maps a declared SQL type word (`STRING(50)`, `int64`, `ARRAY<STRING(10)>` ...)
    /// to a coarse type. Returns `None` for words outside the vocabulary.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let upper = declared.trim().to_ascii_uppercase();
        let base = upper
            .split(|c: char| c == '(' || c == '<' || c.is_whitespace())
            .next()
            .unwrap_or("");

        let ty = match base {
            "STRING" | "VARCHAR" | "CHAR" | "CHARACTER" | "TEXT" | "JSON" | "JSONB" | "BYTES"
            | "UUID" | "NVARCHAR" => ColumnType::String,
            "INT64" | "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "SERIAL"
            | "BIGSERIAL" => ColumnType::Int,
            "FLOAT64" | "FLOAT32" | "FLOAT" | "DOUBLE" | "REAL" | "NUMERIC" | "DECIMAL" => {
                ColumnType::Float
            }
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" => ColumnType::Timestamp,
            "DATE" => ColumnType::Date,
            "BOOL" | "BOOLEAN" => ColumnType::Bool,
            _ => return None,
        };
        Some(ty)
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name (lower-cased)
    pub name: String,
    /// Coarse declared type; `None` outside the recognised vocabulary
    pub col_type: Option<ColumnType>,
    /// Declaration position (0-indexed)
    pub position: usize,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, col_type: Option<ColumnType>, position: usize) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            col_type,
            position,
        }
    }
}

/// Best-effort table schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name (lower-cased)
    pub name: String,
    /// Column definitions in declaration order
    pub columns: Vec<ColumnDef>,
    /// Column name -> index into `columns`
    #[serde(skip)]
    column_map: AHashMap<String, usize>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        let mut schema = Self {
            name: name.into().to_ascii_lowercase(),
            columns,
            column_map: AHashMap::new(),
        };
        schema.rebuild_column_map();
        schema
    }

    /// Rebuild the name -> index map (needed after deserialization)
    pub fn rebuild_column_map(&mut self) {
        self.column_map = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| (col.name.clone(), idx))
            .collect();
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.column_map
            .get(&name.to_ascii_lowercase())
            .and_then(|&idx| self.columns.get(idx))
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.get_column(name).and_then(|col| col.col_type)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Adds columns from `other` that this schema does not know yet.
    /// Existing columns are never replaced.
    pub fn merge(&mut self, other: TableSchema) {
        for col in other.columns {
            if self.column_map.contains_key(&col.name) {
                continue;
            }
            let position = self.columns.len();
            self.column_map.insert(col.name.clone(), position);
            self.columns.push(ColumnDef { position, ..col });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_vocabulary() {
        assert_eq!(ColumnType::from_declared("STRING(50)"), Some(ColumnType::String));
        assert_eq!(ColumnType::from_declared("varchar(255)"), Some(ColumnType::String));
        assert_eq!(ColumnType::from_declared("INT64"), Some(ColumnType::Int));
        assert_eq!(ColumnType::from_declared("serial"), Some(ColumnType::Int));
        assert_eq!(ColumnType::from_declared("NUMERIC"), Some(ColumnType::Float));
        assert_eq!(ColumnType::from_declared("TIMESTAMPTZ"), Some(ColumnType::Timestamp));
        assert_eq!(ColumnType::from_declared("DATE"), Some(ColumnType::Date));
        assert_eq!(ColumnType::from_declared("BOOLEAN"), Some(ColumnType::Bool));
        assert_eq!(ColumnType::from_declared("GEOGRAPHY"), None);
        assert_eq!(ColumnType::from_declared("KEY"), None);
    }

    #[test]
    fn test_table_schema_lookup() {
        let schema = TableSchema::new(
            "Departments",
            vec![
                ColumnDef::new("dept_id", Some(ColumnType::Int), 0),
                ColumnDef::new("Dept_Name", Some(ColumnType::String), 1),
                ColumnDef::new("geo", None, 2),
            ],
        );

        assert_eq!(schema.name, "departments");
        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.column_type("geo"), None);
        assert_eq!(schema.column_type("DEPT_NAME"), Some(ColumnType::String));
        assert_eq!(schema.column_names().collect::<Vec<_>>(), vec!["dept_id", "dept_name", "geo"]);
    }

    #[test]
    fn test_merge_is_additive() {
        let mut schema = TableSchema::new(
            "t",
            vec![ColumnDef::new("a", Some(ColumnType::Int), 0)],
        );
        schema.merge(TableSchema::new(
            "t",
            vec![
                ColumnDef::new("a", Some(ColumnType::String), 0),
                ColumnDef::new("b", Some(ColumnType::Bool), 1),
            ],
        ));

        assert_eq!(schema.column_type("a"), Some(ColumnType::Int));
        assert_eq!(schema.get_column("b").map(|c| c.position), Some(1));
    }
}
