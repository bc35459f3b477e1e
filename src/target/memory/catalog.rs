/// Memory-target catalog: schema objects, stored rows and DDL
use super::{Failure, MemResult, Outcome};
use crate::sql::ast::{
    AlterTableAction, AlterTableStmt, ColumnSpec, CreateIndexStmt, CreateSequenceStmt,
    CreateTableStmt, CreateViewStmt, DataType, DropStmt, Expr, ObjectKind, SelectStmt,
    TableConstraint,
};
use crate::sql::evaluator::{is_valid_date, is_valid_timestamp, EvalError, ExprEvaluator, Scope};
use crate::types::{Row, Value};
use ahash::AHashMap;
use tracing::debug;

const SUPPORTED_SEQUENCE_KINDS: &[&str] = &["bit_reversed_positive"];

/// Database options accepted (and ignored) by ALTER DATABASE
const PASSIVE_DATABASE_OPTIONS: &[&str] = &[
    "optimizer_version",
    "optimizer_statistics_package",
    "version_retention_period",
    "enable_key_visualizer",
    "default_leader",
];

#[derive(Debug, Clone)]
pub(super) struct MemColumn {
    pub name: String,
    pub data_type: DataType,
    pub not_null: bool,
    pub default: Option<Expr>,
    pub identity: bool,
}

#[derive(Debug, Clone)]
pub(super) struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub(super) struct Check {
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub(super) struct MemTable {
    pub name: String,
    pub columns: Vec<MemColumn>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<Check>,
    pub rows: Vec<Row>,
    /// Last value handed out to an identity column
    pub next_identity: i64,
}

impl MemTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn require_column(&self, name: &str) -> MemResult<usize> {
        self.column_index(name).ok_or_else(|| {
            Failure::invalid(format!("Column not found in table {}: {}", self.name, name))
        })
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn scope(&self) -> Scope {
        Scope::single(self.name.clone(), self.column_names())
    }

    /// Values of `columns` in `row`
    pub fn project(&self, row: &[Value], columns: &[String]) -> Vec<Value> {
        columns
            .iter()
            .map(|c| {
                self.column_index(c)
                    .and_then(|idx| row.get(idx).cloned())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }

    pub fn key_of(&self, row: &[Value]) -> Vec<Value> {
        self.project(row, &self.primary_key)
    }
}

#[derive(Debug, Clone)]
pub(super) struct MemIndex {
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone)]
pub(super) struct MemView {
    pub query: SelectStmt,
    /// Tables and views named in FROM / JOIN
    pub sources: Vec<String>,
}

pub(super) struct Catalog {
    pub(super) tables: AHashMap<String, MemTable>,
    pub(super) indexes: AHashMap<String, MemIndex>,
    pub(super) views: AHashMap<String, MemView>,
    sequences: AHashMap<String, String>,
    default_sequence_kind: Option<String>,
    pub(super) evaluator: ExprEvaluator,
}

impl Catalog {
    pub fn new(commit_timestamp: &str) -> Self {
        Self {
            tables: AHashMap::new(),
            indexes: AHashMap::new(),
            views: AHashMap::new(),
            sequences: AHashMap::new(),
            default_sequence_kind: Some(SUPPORTED_SEQUENCE_KINDS[0].to_string()),
            evaluator: ExprEvaluator::new(commit_timestamp),
        }
    }

    pub fn set_default_sequence_kind(&mut self, kind: Option<String>) {
        self.default_sequence_kind = kind;
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn table_rows(&self, table: &str) -> Option<&[Row]> {
        self.tables
            .get(&table.to_ascii_lowercase())
            .map(|t| t.rows.as_slice())
    }

    /// Lookup for DDL: a missing table is NotFound
    fn table_for_ddl(&self, name: &str) -> MemResult<&MemTable> {
        self.tables
            .get(name)
            .ok_or_else(|| Failure::not_found(format!("Table not found: {}", name)))
    }

    /// Lookup for DML and queries: a missing table is InvalidArgument
    pub(super) fn table_for_dml(&self, name: &str) -> MemResult<&MemTable> {
        self.tables
            .get(name)
            .ok_or_else(|| Failure::invalid(format!("Table not found: {}", name)))
    }

    /// Tables, indexes, views and sequences share one namespace
    fn ensure_name_free(&self, name: &str) -> MemResult<()> {
        if self.tables.contains_key(name)
            || self.indexes.contains_key(name)
            || self.views.contains_key(name)
            || self.sequences.contains_key(name)
        {
            return Err(Failure::already_exists(format!("Duplicate name in schema: {}", name)));
        }
        Ok(())
    }

    fn eval_constant(&self, expr: &Expr) -> Result<Value, EvalError> {
        self.evaluator.eval(expr, &Scope::new(), &[])
    }

    // ---------------------------------------------------------------
    // CREATE
    // ---------------------------------------------------------------

    pub fn create_table(&mut self, stmt: CreateTableStmt) -> MemResult<Outcome> {
        let name = stmt.name;
        if stmt.if_not_exists && self.tables.contains_key(&name) {
            return Ok(Outcome::Definition);
        }
        self.ensure_name_free(&name)?;

        let mut columns: Vec<MemColumn> = Vec::with_capacity(stmt.columns.len());
        for spec in stmt.columns {
            if columns.iter().any(|c| c.name == spec.name) {
                return Err(Failure::invalid(format!(
                    "Duplicate column name {}.{}",
                    name, spec.name
                )));
            }
            columns.push(self.build_column(&name, spec)?);
        }

        let mut table = MemTable {
            name: name.clone(),
            columns,
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
            rows: Vec::new(),
            next_identity: 0,
        };

        for key in &stmt.primary_key {
            if table.column_index(key).is_none() {
                return Err(Failure::invalid(format!(
                    "Table {} references nonexistent key column {}",
                    name, key
                )));
            }
        }
        table.primary_key = stmt.primary_key;

        for constraint in stmt.constraints {
            self.add_constraint(&mut table, constraint)?;
        }

        debug!(table = %name, columns = table.columns.len(), "memory target created table");
        self.tables.insert(name, table);
        Ok(Outcome::Definition)
    }

    fn build_column(&self, table: &str, spec: ColumnSpec) -> MemResult<MemColumn> {
        if let DataType::Other(type_name) = &spec.data_type {
            if type_name != "ARRAY" {
                return Err(Failure::invalid(format!("Unsupported column type: {}", type_name)));
            }
        }

        if spec.identity {
            if spec.data_type != DataType::Int64 {
                return Err(Failure::invalid(format!(
                    "Identity column {} must be of type INT64",
                    spec.name
                )));
            }
            let kind = spec
                .sequence_kind
                .as_deref()
                .or(self.default_sequence_kind.as_deref());
            match kind {
                None => {
                    return Err(Failure::invalid(format!(
                        "The sequence kind of an identity column {} is not specified. \
                         Set the sequence kind explicitly or set the database option `default_sequence_kind`.",
                        spec.name
                    )))
                }
                Some(kind) if !SUPPORTED_SEQUENCE_KINDS.contains(&kind) => {
                    return Err(Failure::invalid(format!("Unsupported sequence kind: {}", kind)))
                }
                Some(_) => {}
            }
            if spec.default.is_some() {
                return Err(Failure::invalid(format!(
                    "Identity column {} cannot have a default value",
                    spec.name
                )));
            }
        }

        if let Some(default) = &spec.default {
            self.check_default(table, &spec, default)?;
        }

        Ok(MemColumn {
            name: spec.name,
            data_type: spec.data_type,
            not_null: spec.not_null,
            default: spec.default,
            identity: spec.identity,
        })
    }

    /// 默认值必须是常量表达式，且类型与列一致
    fn check_default(&self, table: &str, spec: &ColumnSpec, default: &Expr) -> MemResult<()> {
        let value = match self.eval_constant(default) {
            Ok(value) => value,
            Err(EvalError::UnknownColumn(column)) => {
                return Err(Failure::invalid(format!(
                    "Default value of column {}.{} cannot reference column {}",
                    table, spec.name, column
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if coerce(value.clone(), &spec.data_type).is_none() {
            let origin = match default {
                Expr::Function { name, .. } => format!(" from {}()", name.to_ascii_uppercase()),
                _ => String::new(),
            };
            return Err(Failure::invalid(format!(
                "Expected type {} for column {}.{}; found {}{}",
                spec.data_type.name(),
                table,
                spec.name,
                value.type_name(),
                origin
            )));
        }
        Ok(())
    }

    /// Validates `constraint` against `table` (and existing rows) and attaches it
    fn add_constraint(&self, table: &mut MemTable, constraint: TableConstraint) -> MemResult<()> {
        match constraint {
            TableConstraint::ForeignKey {
                name,
                columns,
                ref_table,
                ref_columns,
            } => {
                let name = name.unwrap_or_else(|| {
                    format!("FK_{}_{}_{}", table.name, ref_table, table.foreign_keys.len() + 1)
                });
                let fk = ForeignKey {
                    name,
                    columns,
                    ref_table,
                    ref_columns,
                };

                let parent = if fk.ref_table == table.name {
                    &*table
                } else {
                    self.table_for_ddl(&fk.ref_table)?
                };
                validate_foreign_key(table, parent, &fk)?;

                for row in &table.rows {
                    let values = table.project(row, &fk.columns);
                    if values.iter().any(Value::is_null) {
                        continue;
                    }
                    if !parent.rows.iter().any(|r| parent.project(r, &fk.ref_columns) == values) {
                        return Err(Failure::precondition(format!(
                            "Foreign key `{}` is violated by existing row [{}] in table `{}`",
                            fk.name,
                            format_key(&table.key_of(row)),
                            table.name
                        )));
                    }
                }
                table.foreign_keys.push(fk);
            }
            TableConstraint::Check { name, expr } => {
                let name = name
                    .unwrap_or_else(|| format!("CK_{}_{}", table.name, table.checks.len() + 1));
                let scope = table.scope();
                let null_row = vec![Value::Null; table.columns.len()];
                if let Err(e) = self.evaluator.eval(&expr, &scope, &null_row) {
                    return Err(Failure::invalid(format!(
                        "Error parsing expression of check constraint {}: {}",
                        name, e
                    )));
                }
                for row in &table.rows {
                    if self.evaluator.eval(&expr, &scope, row)? == Value::Bool(false) {
                        return Err(Failure::precondition(format!(
                            "Check constraint `{}`.`{}` is violated for key ({})",
                            table.name,
                            name,
                            format_key(&table.key_of(row))
                        )));
                    }
                }
                table.checks.push(Check { name, expr });
            }
        }
        Ok(())
    }

    pub fn create_index(&mut self, stmt: CreateIndexStmt) -> MemResult<Outcome> {
        if stmt.if_not_exists && self.indexes.contains_key(&stmt.name) {
            return Ok(Outcome::Definition);
        }
        self.ensure_name_free(&stmt.name)?;

        let table = self.table_for_ddl(&stmt.table)?;
        for column in &stmt.columns {
            if table.column_index(column).is_none() {
                return Err(Failure::not_found(format!(
                    "Index {} specifies key column {} which does not exist in the index's base table.",
                    stmt.name, column
                )));
            }
        }

        if stmt.unique {
            let mut seen: Vec<Vec<Value>> = Vec::with_capacity(table.rows.len());
            for row in &table.rows {
                let key = table.project(row, &stmt.columns);
                if key.iter().any(Value::is_null) {
                    continue;
                }
                if seen.contains(&key) {
                    return Err(Failure::precondition(format!(
                        "Found uniqueness violation on index {}, duplicate key: [{}]",
                        stmt.name,
                        format_key(&key)
                    )));
                }
                seen.push(key);
            }
        }

        debug!(index = %stmt.name, table = %stmt.table, "memory target created index");
        self.indexes.insert(
            stmt.name,
            MemIndex {
                table: stmt.table,
                columns: stmt.columns,
                unique: stmt.unique,
            },
        );
        Ok(Outcome::Definition)
    }

    pub fn create_view(&mut self, stmt: CreateViewStmt) -> MemResult<Outcome> {
        let name = stmt.name;
        if stmt.security.is_none() {
            return Err(Failure::invalid(format!(
                "Error parsing the definition of view `{}`: missing SQL SECURITY clause",
                name
            )));
        }

        if !(stmt.or_replace && self.views.contains_key(&name)) {
            self.ensure_name_free(&name)?;
        }

        let (columns, _) = self.select(&stmt.query).map_err(|f| {
            Failure::invalid(format!("Error parsing the definition of view `{}`: {}", name, f.desc))
        })?;
        if let Some(pos) = columns.iter().position(|c| c.starts_with('$')) {
            return Err(Failure::invalid(format!(
                "Error parsing the definition of view `{}`: column {} has no name",
                name,
                pos + 1
            )));
        }

        let mut sources: Vec<String> = stmt.query.from.iter().map(|t| t.name.clone()).collect();
        sources.extend(stmt.query.joins.iter().map(|j| j.table.name.clone()));

        debug!(view = %name, "memory target created view");
        self.views.insert(
            name,
            MemView {
                query: stmt.query,
                sources,
            },
        );
        Ok(Outcome::Definition)
    }

    pub fn create_sequence(&mut self, stmt: CreateSequenceStmt) -> MemResult<Outcome> {
        if stmt.if_not_exists && self.sequences.contains_key(&stmt.name) {
            return Ok(Outcome::Definition);
        }
        self.ensure_name_free(&stmt.name)?;

        let mut kind = None;
        for (key, expr) in &stmt.options {
            match key.as_str() {
                "sequence_kind" => match self.eval_constant(expr)? {
                    Value::Text(s) => kind = Some(s.to_ascii_lowercase()),
                    other => {
                        return Err(Failure::invalid(format!(
                            "Option sequence_kind expects a STRING; found {}",
                            other.type_name()
                        )))
                    }
                },
                "skip_range_min" | "skip_range_max" | "start_with_counter" => {}
                other => {
                    return Err(Failure::invalid(format!("Unsupported sequence option: {}", other)))
                }
            }
        }

        let kind = kind.or_else(|| self.default_sequence_kind.clone()).ok_or_else(|| {
            Failure::invalid(format!("The sequence kind of sequence {} is not specified", stmt.name))
        })?;
        if !SUPPORTED_SEQUENCE_KINDS.contains(&kind.as_str()) {
            return Err(Failure::invalid(format!("Unsupported sequence kind: {}", kind)));
        }

        self.sequences.insert(stmt.name, kind);
        Ok(Outcome::Definition)
    }

    // ---------------------------------------------------------------
    // DROP / ALTER
    // ---------------------------------------------------------------

    pub fn drop_object(&mut self, stmt: DropStmt) -> MemResult<Outcome> {
        let name = stmt.name;
        let exists = match stmt.kind {
            ObjectKind::Table => self.tables.contains_key(&name),
            ObjectKind::Index => self.indexes.contains_key(&name),
            ObjectKind::View => self.views.contains_key(&name),
            ObjectKind::Sequence => self.sequences.contains_key(&name),
        };
        if !exists {
            if stmt.if_exists {
                return Ok(Outcome::Definition);
            }
            return Err(Failure::not_found(format!(
                "{} not found: {}",
                stmt.kind.as_str(),
                name
            )));
        }

        match stmt.kind {
            ObjectKind::Table => {
                self.ensure_droppable_table(&name)?;
                self.tables.remove(&name);
            }
            ObjectKind::Index => {
                self.indexes.remove(&name);
            }
            ObjectKind::View => {
                if let Some(dependent) = self.dependent_view(&name) {
                    return Err(Failure::precondition(format!(
                        "Cannot drop view {}: view {} depends on it.",
                        name, dependent
                    )));
                }
                self.views.remove(&name);
            }
            ObjectKind::Sequence => {
                self.sequences.remove(&name);
            }
        }

        debug!(object = %name, kind = stmt.kind.as_str(), "memory target dropped object");
        Ok(Outcome::Definition)
    }

    fn ensure_droppable_table(&self, name: &str) -> MemResult<()> {
        let mut indexes: Vec<&str> = self
            .indexes
            .iter()
            .filter(|(_, index)| index.table == name)
            .map(|(index_name, _)| index_name.as_str())
            .collect();
        if !indexes.is_empty() {
            indexes.sort_unstable();
            return Err(Failure::precondition(format!(
                "Cannot drop table {} with indices: {}.",
                name,
                indexes.join(", ")
            )));
        }

        let mut referencing: Vec<(&str, &str)> = self
            .tables
            .values()
            .filter(|t| t.name != name)
            .flat_map(|t| {
                t.foreign_keys
                    .iter()
                    .filter(|fk| fk.ref_table == name)
                    .map(move |fk| (t.name.as_str(), fk.name.as_str()))
            })
            .collect();
        referencing.sort_unstable();
        if let Some((child, fk)) = referencing.first() {
            return Err(Failure::precondition(format!(
                "Cannot drop table {}: it is referenced by foreign key {} on table {}.",
                name, fk, child
            )));
        }

        if let Some(view) = self.dependent_view(name) {
            return Err(Failure::precondition(format!(
                "Cannot drop table {}: view {} depends on it.",
                name, view
            )));
        }
        Ok(())
    }

    /// First view (by name) reading from `source`
    fn dependent_view(&self, source: &str) -> Option<String> {
        let mut views: Vec<&String> = self
            .views
            .iter()
            .filter(|(_, view)| view.sources.iter().any(|s| s == source))
            .map(|(name, _)| name)
            .collect();
        views.sort_unstable();
        views.first().map(|name| name.to_string())
    }

    pub fn alter_table(&mut self, stmt: AlterTableStmt) -> MemResult<Outcome> {
        let name = stmt.table;
        self.table_for_ddl(&name)?;

        match stmt.action {
            AlterTableAction::AddColumn {
                column,
                if_not_exists,
            } => {
                let table = self.table_for_ddl(&name)?;
                if table.column_index(&column.name).is_some() {
                    if if_not_exists {
                        return Ok(Outcome::Definition);
                    }
                    return Err(Failure::invalid(format!(
                        "Duplicate column name {}.{}",
                        name, column.name
                    )));
                }
                if column.not_null && column.default.is_none() && !table.rows.is_empty() {
                    return Err(Failure::precondition(format!(
                        "Cannot add NOT NULL column {}.{} to a non-empty table",
                        name, column.name
                    )));
                }

                let column = self.build_column(&name, column)?;
                let mut fills = Vec::with_capacity(table.rows.len());
                for _ in 0..table.rows.len() {
                    let value = match &column.default {
                        Some(expr) => coerce(self.eval_constant(expr)?, &column.data_type)
                            .unwrap_or(Value::Null),
                        None => Value::Null,
                    };
                    fills.push(value);
                }

                if let Some(table) = self.tables.get_mut(&name) {
                    for (row, value) in table.rows.iter_mut().zip(fills) {
                        row.push(value);
                    }
                    table.columns.push(column);
                }
            }

            AlterTableAction::DropColumn(column) => {
                let table = self.table_for_ddl(&name)?;
                let idx = table.column_index(&column).ok_or_else(|| {
                    Failure::not_found(format!("Column not found in table {}: {}", name, column))
                })?;
                self.ensure_droppable_column(table, &column)?;

                if let Some(table) = self.tables.get_mut(&name) {
                    table.columns.remove(idx);
                    for row in &mut table.rows {
                        row.remove(idx);
                    }
                }
            }

            AlterTableAction::AddConstraint(constraint) => {
                let Some(mut table) = self.tables.remove(&name) else {
                    return Err(Failure::not_found(format!("Table not found: {}", name)));
                };
                let result = self.add_constraint(&mut table, constraint);
                self.tables.insert(name, table);
                result?;
            }
        }

        Ok(Outcome::Definition)
    }

    fn ensure_droppable_column(&self, table: &MemTable, column: &str) -> MemResult<()> {
        let blocked = |reason: String| {
            Failure::precondition(format!(
                "Cannot drop column {}.{}: {}",
                table.name, column, reason
            ))
        };

        if table.primary_key.iter().any(|k| k == column) {
            return Err(blocked("it is part of the primary key".into()));
        }

        let mut indexes: Vec<&String> = self
            .indexes
            .iter()
            .filter(|(_, index)| index.table == table.name && index.columns.iter().any(|c| c == column))
            .map(|(index_name, _)| index_name)
            .collect();
        indexes.sort_unstable();
        if let Some(index) = indexes.first() {
            return Err(blocked(format!("it is used by index {}", index)));
        }

        if let Some(fk) = table.foreign_keys.iter().find(|fk| fk.columns.iter().any(|c| c == column)) {
            return Err(blocked(format!("it is used by foreign key {}", fk.name)));
        }
        for other in self.tables.values() {
            if let Some(fk) = other.foreign_keys.iter().find(|fk| {
                fk.ref_table == table.name && fk.ref_columns.iter().any(|c| c == column)
            }) {
                return Err(blocked(format!("it is referenced by foreign key {}", fk.name)));
            }
        }

        let remaining: Vec<String> = table
            .column_names()
            .into_iter()
            .filter(|c| c != column)
            .collect();
        let scope = Scope::single(table.name.clone(), remaining);
        let null_row = vec![Value::Null; scope.width()];
        for check in &table.checks {
            if let Err(EvalError::UnknownColumn(_)) = self.evaluator.eval(&check.expr, &scope, &null_row) {
                return Err(blocked(format!("it is used by check constraint {}", check.name)));
            }
        }
        Ok(())
    }

    pub fn alter_database(&mut self, options: Vec<(String, Expr)>) -> MemResult<Outcome> {
        for (key, expr) in options {
            let key = key.to_ascii_lowercase();
            if key == "default_sequence_kind" {
                match self.eval_constant(&expr)? {
                    Value::Null => self.default_sequence_kind = None,
                    Value::Text(kind) => {
                        let kind = kind.to_ascii_lowercase();
                        if !SUPPORTED_SEQUENCE_KINDS.contains(&kind.as_str()) {
                            return Err(Failure::invalid(format!("Unsupported sequence kind: {}", kind)));
                        }
                        self.default_sequence_kind = Some(kind);
                    }
                    other => {
                        return Err(Failure::invalid(format!(
                            "Option default_sequence_kind expects a STRING; found {}",
                            other.type_name()
                        )))
                    }
                }
            } else if !PASSIVE_DATABASE_OPTIONS.contains(&key.as_str()) {
                return Err(Failure::invalid(format!("Unsupported database option: {}", key)));
            }
        }
        Ok(Outcome::Definition)
    }
}

fn validate_foreign_key(child: &MemTable, parent: &MemTable, fk: &ForeignKey) -> MemResult<()> {
    if fk.columns.len() != fk.ref_columns.len() {
        return Err(Failure::invalid(format!(
            "Foreign key {} has {} referencing columns but {} referenced columns",
            fk.name,
            fk.columns.len(),
            fk.ref_columns.len()
        )));
    }

    for (column, ref_column) in fk.columns.iter().zip(&fk.ref_columns) {
        let child_idx = child.column_index(column).ok_or_else(|| {
            Failure::invalid(format!(
                "Foreign key {} references nonexistent column {} in table {}",
                fk.name, column, child.name
            ))
        })?;
        let parent_idx = parent.column_index(ref_column).ok_or_else(|| {
            Failure::invalid(format!(
                "Foreign key {} references nonexistent column {} in table {}",
                fk.name, ref_column, parent.name
            ))
        })?;

        let child_type = child.columns[child_idx].data_type.name();
        let parent_type = parent.columns[parent_idx].data_type.name();
        if child_type != parent_type {
            return Err(Failure::invalid(format!(
                "Foreign key {} column {}.{} has type {} but referenced column {}.{} has type {}",
                fk.name, child.name, column, child_type, parent.name, ref_column, parent_type
            )));
        }
    }
    Ok(())
}

/// Literal coercion into a column type; `None` when the types are incompatible
pub(super) fn coerce(value: Value, data_type: &DataType) -> Option<Value> {
    match (data_type, value) {
        (_, Value::Null) => Some(Value::Null),
        (DataType::Other(_), v) => Some(v),
        (DataType::Int64, v @ Value::Integer(_)) => Some(v),
        (DataType::Float64 | DataType::Float32 | DataType::Numeric, Value::Integer(i)) => {
            Some(Value::Float(i as f64))
        }
        (DataType::Float64 | DataType::Float32 | DataType::Numeric, v @ Value::Float(_)) => Some(v),
        (DataType::Bool, v @ Value::Bool(_)) => Some(v),
        (DataType::String(_) | DataType::Bytes(_) | DataType::Json, v @ Value::Text(_)) => Some(v),
        (DataType::Date, v @ Value::Date(_)) => Some(v),
        (DataType::Date, Value::Text(s)) if is_valid_date(&s) => Some(Value::Date(s)),
        (DataType::Timestamp, v @ Value::Timestamp(_)) => Some(v),
        (DataType::Timestamp, Value::Text(s)) if is_valid_timestamp(&s) => Some(Value::Timestamp(s)),
        _ => None,
    }
}

/// `a, b` rendering of a key
pub(super) fn format_key(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::error::DriverResult;
    use crate::target::{Connection, MemoryConnection};

    fn run_all(conn: &mut MemoryConnection, statements: &[&str]) {
        for sql in statements {
            conn.execute(sql).unwrap();
        }
    }

    fn err(conn: &mut MemoryConnection, sql: &str) -> String {
        let result: DriverResult<u64> = conn.execute(sql);
        result.unwrap_err().message().to_string()
    }

    #[test]
    fn test_duplicate_name_in_schema() {
        let mut conn = MemoryConnection::new();
        run_all(&mut conn, &["CREATE TABLE t (a INT64) PRIMARY KEY (a)"]);
        assert_eq!(
            err(&mut conn, "CREATE TABLE t (a INT64) PRIMARY KEY (a)"),
            "rpc error: code = AlreadyExists desc = Duplicate name in schema: t"
        );
        conn.execute("CREATE TABLE IF NOT EXISTS t (a INT64) PRIMARY KEY (a)").unwrap();
        assert!(err(&mut conn, "CREATE INDEX t ON t (a)").contains("AlreadyExists"));
    }

    #[test]
    fn test_unsupported_column_type() {
        let mut conn = MemoryConnection::new();
        let msg = err(&mut conn, "CREATE TABLE t (a VARCHAR(10)) PRIMARY KEY (a)");
        assert!(msg.ends_with("Unsupported column type: VARCHAR"));
    }

    #[test]
    fn test_generate_uuid_default_on_int64() {
        let mut conn = MemoryConnection::new();
        let msg = err(
            &mut conn,
            "CREATE TABLE t (id INT64 NOT NULL DEFAULT (GENERATE_UUID())) PRIMARY KEY (id)",
        );
        assert!(msg.contains("code = InvalidArgument"));
        assert!(msg.contains("Expected type INT64 for column t.id; found STRING from GENERATE_UUID()"));
    }

    #[test]
    fn test_identity_column_sequence_kind() {
        let mut conn = MemoryConnection::new().without_default_sequence_kind();
        let msg = err(
            &mut conn,
            "CREATE TABLE t (id INT64 GENERATED BY DEFAULT AS IDENTITY, v STRING(10)) PRIMARY KEY (id)",
        );
        assert!(msg.contains("The sequence kind of an identity column id is not specified"));

        let msg = err(
            &mut conn,
            "CREATE TABLE t (id INT64 GENERATED BY DEFAULT AS IDENTITY (SERIAL)) PRIMARY KEY (id)",
        );
        assert!(msg.ends_with("Unsupported sequence kind: serial"));

        conn.execute("ALTER DATABASE db SET OPTIONS (default_sequence_kind = 'bit_reversed_positive')")
            .unwrap();
        conn.execute("CREATE TABLE t (id INT64 AUTO_INCREMENT, v STRING(10)) PRIMARY KEY (id)")
            .unwrap();
        conn.execute("INSERT INTO t (v) VALUES ('a'), ('b')").unwrap();
        let rows = conn.table_rows("t").unwrap();
        assert_eq!(rows[1][0], crate::types::Value::Integer(2));
    }

    #[test]
    fn test_view_requires_sql_security() {
        let mut conn = MemoryConnection::new();
        run_all(&mut conn, &["CREATE TABLE t (a INT64) PRIMARY KEY (a)"]);
        let msg = err(&mut conn, "CREATE VIEW v AS SELECT a FROM t");
        assert!(msg.ends_with("Error parsing the definition of view `v`: missing SQL SECURITY clause"));
        conn.execute("CREATE VIEW v SQL SECURITY INVOKER AS SELECT a FROM t").unwrap();
        conn.execute("CREATE OR REPLACE VIEW v SQL SECURITY INVOKER AS SELECT a AS b FROM t")
            .unwrap();
    }

    #[test]
    fn test_foreign_key_to_missing_table() {
        let mut conn = MemoryConnection::new();
        let msg = err(
            &mut conn,
            "CREATE TABLE e (id INT64, dept_id STRING(36), \
             CONSTRAINT fk_dept FOREIGN KEY (dept_id) REFERENCES departments (dept_id)) PRIMARY KEY (id)",
        );
        assert_eq!(msg, "rpc error: code = NotFound desc = Table not found: departments");
    }

    #[test]
    fn test_drop_table_guards() {
        let mut conn = MemoryConnection::new();
        run_all(
            &mut conn,
            &[
                "CREATE TABLE d (id STRING(36)) PRIMARY KEY (id)",
                "CREATE TABLE e (id INT64, dept_id STRING(36), FOREIGN KEY (dept_id) REFERENCES d (id)) PRIMARY KEY (id)",
                "CREATE INDEX idx_e ON e (dept_id)",
            ],
        );
        assert!(err(&mut conn, "DROP TABLE d").contains("referenced by foreign key"));
        assert!(err(&mut conn, "DROP TABLE e").contains("Cannot drop table e with indices: idx_e."));
        run_all(&mut conn, &["DROP INDEX idx_e", "DROP TABLE e", "DROP TABLE d"]);
        assert_eq!(err(&mut conn, "DROP TABLE d"), "rpc error: code = NotFound desc = Table not found: d");
        conn.execute("DROP TABLE IF EXISTS d").unwrap();
    }

    #[test]
    fn test_alter_table_columns() {
        let mut conn = MemoryConnection::new();
        run_all(
            &mut conn,
            &[
                "CREATE TABLE t (a INT64, b STRING(10)) PRIMARY KEY (a)",
                "INSERT INTO t (a, b) VALUES (1, 'x')",
                "ALTER TABLE t ADD COLUMN c BOOL DEFAULT (TRUE)",
            ],
        );
        assert_eq!(conn.table_rows("t").unwrap()[0].len(), 3);
        assert!(err(&mut conn, "ALTER TABLE t ADD COLUMN d INT64 NOT NULL").contains("non-empty table"));
        assert!(err(&mut conn, "ALTER TABLE t DROP COLUMN a").contains("primary key"));
        conn.execute("ALTER TABLE t DROP COLUMN b").unwrap();
        assert_eq!(conn.table_rows("t").unwrap()[0].len(), 2);
    }

    #[test]
    fn test_sequence_options() {
        let mut conn = MemoryConnection::new();
        conn.execute("CREATE SEQUENCE s OPTIONS (sequence_kind = 'bit_reversed_positive')")
            .unwrap();
        assert!(err(&mut conn, "CREATE SEQUENCE s2 OPTIONS (sequence_kind = 'ordered')")
            .ends_with("Unsupported sequence kind: ordered"));
        conn.execute("DROP SEQUENCE s").unwrap();
    }
}
