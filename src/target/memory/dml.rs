/// Memory-target DML: INSERT / UPDATE / DELETE with constraint enforcement
use super::catalog::{coerce, format_key, Catalog, MemTable};
use super::{Failure, MemResult, Outcome};
use crate::sql::ast::{DeleteStmt, InsertSource, InsertStmt, UpdateStmt};
use crate::sql::evaluator::Scope;
use crate::types::{Row, Value};

impl Catalog {
    pub fn insert(&mut self, stmt: InsertStmt) -> MemResult<Outcome> {
        let table = self.table_for_dml(&stmt.table)?;

        let mut positions = Vec::with_capacity(stmt.columns.len());
        for column in &stmt.columns {
            let idx = table.require_column(column)?;
            if positions.contains(&idx) {
                return Err(Failure::invalid(format!(
                    "INSERT has columns with duplicate name: {}",
                    column
                )));
            }
            positions.push(idx);
        }

        let source_rows: Vec<Row> = match &stmt.source {
            InsertSource::Values(rows) => {
                let empty = Scope::new();
                let mut values = Vec::with_capacity(rows.len());
                for exprs in rows {
                    let row = exprs
                        .iter()
                        .map(|e| self.evaluator.eval(e, &empty, &[]))
                        .collect::<Result<Row, _>>()?;
                    values.push(row);
                }
                values
            }
            InsertSource::Query(query) => self.select(query)?.1,
        };

        let mut next_identity = table.next_identity;
        let mut new_rows: Vec<Row> = Vec::with_capacity(source_rows.len());
        for values in source_rows {
            if values.len() != positions.len() {
                return Err(Failure::invalid(format!(
                    "Inserted row has wrong column count; Has {}, expected {}",
                    values.len(),
                    positions.len()
                )));
            }

            let mut row = vec![Value::Null; table.columns.len()];
            let mut provided = vec![false; table.columns.len()];
            for (&idx, value) in positions.iter().zip(values) {
                row[idx] = value;
                provided[idx] = true;
            }

            for (idx, column) in table.columns.iter().enumerate() {
                if provided[idx] {
                    continue;
                }
                if column.identity {
                    next_identity += 1;
                    row[idx] = Value::Integer(next_identity);
                } else if let Some(default) = &column.default {
                    row[idx] = self.evaluator.eval(default, &Scope::new(), &[])?;
                } else if column.not_null {
                    return Err(Failure::precondition(format!(
                        "A new row in table {} does not specify a non-null value for NOT NULL column: {}",
                        table.name, column.name
                    )));
                }
            }

            new_rows.push(self.validate_row(table, row)?);
        }

        self.check_primary_keys(table, &new_rows)?;
        self.check_unique_indexes(table, &new_rows, &[])?;
        for row in &new_rows {
            self.check_foreign_keys(table, row, &new_rows)?;
        }

        let returned = match &stmt.returning {
            Some(items) => Some(self.project_rows(items, &table.scope(), &new_rows)?),
            None => None,
        };
        let count = new_rows.len() as u64;

        if let Some(table) = self.tables.get_mut(&stmt.table) {
            table.rows.extend(new_rows);
            table.next_identity = next_identity;
        }

        Ok(match returned {
            Some((_, rows)) => Outcome::Rows(rows),
            None => Outcome::Modified(count),
        })
    }

    pub fn update(&mut self, stmt: UpdateStmt) -> MemResult<Outcome> {
        let table = self.table_for_dml(&stmt.table)?;
        let Some(predicate) = &stmt.where_clause else {
            return Err(Failure::invalid("UPDATE must have a WHERE clause"));
        };

        let mut targets = Vec::with_capacity(stmt.assignments.len());
        for (column, expr) in &stmt.assignments {
            let idx = table.require_column(column)?;
            if table.primary_key.iter().any(|k| k == column) {
                return Err(Failure::invalid(format!(
                    "Cannot update primary key column {}.{}",
                    table.name, column
                )));
            }
            targets.push((idx, expr));
        }

        let scope = table.scope();
        let mut positions = Vec::new();
        let mut new_rows = Vec::new();
        for (pos, row) in table.rows.iter().enumerate() {
            if !self.evaluator.eval_predicate(predicate, &scope, row)? {
                continue;
            }
            let mut updated = row.clone();
            for (idx, expr) in &targets {
                updated[*idx] = self.evaluator.eval(expr, &scope, row)?;
            }
            let updated = self.validate_row(table, updated)?;
            self.check_foreign_keys(table, &updated, &[])?;
            positions.push(pos);
            new_rows.push(updated);
        }

        self.check_unique_indexes(table, &new_rows, &positions)?;
        self.check_not_referenced(table, &positions, &new_rows, false)?;

        let count = positions.len() as u64;
        if let Some(table) = self.tables.get_mut(&stmt.table) {
            for (pos, row) in positions.into_iter().zip(new_rows) {
                table.rows[pos] = row;
            }
        }
        Ok(Outcome::Modified(count))
    }

    pub fn delete(&mut self, stmt: DeleteStmt) -> MemResult<Outcome> {
        let table = self.table_for_dml(&stmt.table)?;
        let Some(predicate) = &stmt.where_clause else {
            return Err(Failure::invalid("DELETE must have a WHERE clause"));
        };

        let scope = table.scope();
        let mut positions = Vec::new();
        for (pos, row) in table.rows.iter().enumerate() {
            if self.evaluator.eval_predicate(predicate, &scope, row)? {
                positions.push(pos);
            }
        }
        self.check_not_referenced(table, &positions, &[], true)?;

        let count = positions.len() as u64;
        if let Some(table) = self.tables.get_mut(&stmt.table) {
            let mut idx = 0;
            table.rows.retain(|_| {
                let keep = !positions.contains(&idx);
                idx += 1;
                keep
            });
        }
        Ok(Outcome::Modified(count))
    }

    /// Coerces values to column types and enforces NOT NULL, length and CHECK
    fn validate_row(&self, table: &MemTable, row: Row) -> MemResult<Row> {
        let mut out = Vec::with_capacity(row.len());
        for (column, value) in table.columns.iter().zip(row) {
            let found = value.type_name();
            let value = coerce(value, &column.data_type).ok_or_else(|| {
                Failure::invalid(format!(
                    "Expected type {} for column {}.{}; found {}",
                    column.data_type.name(),
                    table.name,
                    column.name,
                    found
                ))
            })?;

            if value.is_null() && column.not_null {
                return Err(Failure::precondition(format!(
                    "Cannot specify a null value for column: {}.{}",
                    table.name, column.name
                )));
            }
            if let (Some(limit), Value::Text(s)) = (column.data_type.max_length(), &value) {
                let size = s.chars().count();
                if size > limit {
                    return Err(Failure::precondition(format!(
                        "New value exceeds the maximum size limit for this column: {}.{}, size: {}, limit: {}",
                        table.name, column.name, size, limit
                    )));
                }
            }
            out.push(value);
        }

        let scope = table.scope();
        for check in &table.checks {
            if self.evaluator.eval(&check.expr, &scope, &out)? == Value::Bool(false) {
                return Err(Failure::precondition(format!(
                    "Check constraint `{}`.`{}` is violated for key ({})",
                    table.name,
                    check.name,
                    format_key(&table.key_of(&out))
                )));
            }
        }
        Ok(out)
    }

    fn check_primary_keys(&self, table: &MemTable, new_rows: &[Row]) -> MemResult<()> {
        let mut seen: Vec<Vec<Value>> = table.rows.iter().map(|r| table.key_of(r)).collect();
        for row in new_rows {
            let key = table.key_of(row);
            if seen.contains(&key) {
                return Err(Failure::already_exists(format!(
                    "Row [{}] in table {} already exists",
                    format_key(&key),
                    table.name
                )));
            }
            seen.push(key);
        }
        Ok(())
    }

    /// `replaced` rows of the table are being overwritten by `new_rows`
    fn check_unique_indexes(&self, table: &MemTable, new_rows: &[Row], replaced: &[usize]) -> MemResult<()> {
        let mut unique: Vec<(&String, &Vec<String>)> = self
            .indexes
            .iter()
            .filter(|(_, index)| index.unique && index.table == table.name)
            .map(|(name, index)| (name, &index.columns))
            .collect();
        unique.sort_unstable();

        for (name, columns) in unique {
            let mut seen: Vec<Vec<Value>> = table
                .rows
                .iter()
                .enumerate()
                .filter(|(pos, _)| !replaced.contains(pos))
                .map(|(_, row)| table.project(row, columns))
                .filter(|key| !key.iter().any(Value::is_null))
                .collect();
            for row in new_rows {
                let key = table.project(row, columns);
                if key.iter().any(Value::is_null) {
                    continue;
                }
                if seen.contains(&key) {
                    return Err(Failure::already_exists(format!(
                        "Unique index violation on index {} at index key [{}]",
                        name,
                        format_key(&key)
                    )));
                }
                seen.push(key);
            }
        }
        Ok(())
    }

    /// Outgoing foreign keys of `row`; `batch` holds sibling rows of a self-referencing insert
    fn check_foreign_keys(&self, table: &MemTable, row: &[Value], batch: &[Row]) -> MemResult<()> {
        let no_rows: &[Row] = &[];
        for fk in &table.foreign_keys {
            let values = table.project(row, &fk.columns);
            if values.iter().any(Value::is_null) {
                continue;
            }

            let (parent, pending): (&MemTable, &[Row]) = if fk.ref_table == table.name {
                (table, batch)
            } else {
                match self.tables.get(&fk.ref_table) {
                    Some(parent) => (parent, no_rows),
                    None => {
                        return Err(Failure::precondition(format!(
                            "Foreign key `{}` references missing table {}",
                            fk.name, fk.ref_table
                        )))
                    }
                }
            };

            let found = parent
                .rows
                .iter()
                .chain(pending.iter())
                .any(|r| parent.project(r, &fk.ref_columns) == values);
            if !found {
                return Err(Failure::precondition(format!(
                    "Foreign key constraint `{}` is violated on table `{}`. Cannot find referenced values in {}({}).",
                    fk.name,
                    table.name,
                    fk.ref_table,
                    fk.ref_columns.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Inbound foreign keys: rows at `removed` disappear (or become `replacements`)
    fn check_not_referenced(
        &self,
        table: &MemTable,
        removed: &[usize],
        replacements: &[Row],
        deleting: bool,
    ) -> MemResult<()> {
        let mut children: Vec<&MemTable> = self.tables.values().collect();
        children.sort_unstable_by(|a, b| a.name.cmp(&b.name));

        for child in children {
            let self_reference = child.name == table.name;
            for fk in child.foreign_keys.iter().filter(|fk| fk.ref_table == table.name) {
                for &pos in removed {
                    let values = table.project(&table.rows[pos], &fk.ref_columns);
                    if values.iter().any(Value::is_null)
                        || replacements
                            .iter()
                            .any(|r| table.project(r, &fk.ref_columns) == values)
                    {
                        continue;
                    }

                    let referenced = child
                        .rows
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| !(deleting && self_reference && removed.contains(i)))
                        .any(|(_, r)| child.project(r, &fk.columns) == values);
                    if referenced {
                        return Err(Failure::precondition(format!(
                            "Foreign key constraint `{}` is violated on table `{}`. \
                             Row [{}] of {} is still referenced.",
                            fk.name,
                            child.name,
                            format_key(&values),
                            table.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::target::{Connection, MemoryConnection};
    use crate::types::Value;

    fn setup() -> MemoryConnection {
        let mut conn = MemoryConnection::new();
        for sql in [
            "CREATE TABLE departments (
                dept_id STRING(36) NOT NULL,
                dept_name STRING(10) NOT NULL,
                budget NUMERIC
            ) PRIMARY KEY (dept_id)",
            "CREATE TABLE employees (
                emp_id INT64 NOT NULL,
                dept_id STRING(36),
                salary FLOAT64,
                hire_date DATE,
                CONSTRAINT fk_dept FOREIGN KEY (dept_id) REFERENCES departments (dept_id),
                CONSTRAINT ck_salary CHECK (salary > 0)
            ) PRIMARY KEY (emp_id)",
            "INSERT INTO departments (dept_id, dept_name) VALUES ('D1', 'Eng')",
        ] {
            conn.execute(sql).unwrap();
        }
        conn
    }

    fn err(conn: &mut MemoryConnection, sql: &str) -> String {
        conn.execute(sql).unwrap_err().message().to_string()
    }

    #[test]
    fn test_insert_coerces_literals() {
        let mut conn = setup();
        conn.execute("INSERT INTO employees (emp_id, dept_id, salary, hire_date) VALUES (1, 'D1', 75000, '2024-01-01')")
            .unwrap();
        let row = &conn.table_rows("employees").unwrap()[0];
        assert_eq!(row[2], Value::Float(75000.0));
        assert_eq!(row[3], Value::Date("2024-01-01".into()));
    }

    #[test]
    fn test_type_mismatch() {
        let mut conn = setup();
        let msg = err(&mut conn, "INSERT INTO employees (emp_id) VALUES ('x')");
        assert_eq!(
            msg,
            "rpc error: code = InvalidArgument desc = Expected type INT64 for column employees.emp_id; found STRING"
        );
    }

    #[test]
    fn test_not_null_and_length() {
        let mut conn = setup();
        assert!(err(&mut conn, "INSERT INTO departments (dept_id) VALUES ('D2')")
            .contains("code = FailedPrecondition desc = A new row in table departments does not specify a non-null value"));
        assert!(err(&mut conn, "INSERT INTO departments (dept_id, dept_name) VALUES ('D2', NULL)")
            .ends_with("Cannot specify a null value for column: departments.dept_name"));
        assert!(err(&mut conn, "INSERT INTO departments (dept_id, dept_name) VALUES ('D2', 'Engineering Dept')")
            .contains("exceeds the maximum size limit"));
    }

    #[test]
    fn test_duplicate_primary_key() {
        let mut conn = setup();
        assert_eq!(
            err(&mut conn, "INSERT INTO departments (dept_id, dept_name) VALUES ('D1', 'Ops')"),
            "rpc error: code = AlreadyExists desc = Row [D1] in table departments already exists"
        );
        // batch is atomic
        assert!(err(&mut conn, "INSERT INTO departments (dept_id, dept_name) VALUES ('D2', 'a'), ('D2', 'b')")
            .contains("AlreadyExists"));
        assert_eq!(conn.table_rows("departments").unwrap().len(), 1);
    }

    #[test]
    fn test_foreign_key_and_check() {
        let mut conn = setup();
        assert!(err(&mut conn, "INSERT INTO employees (emp_id, dept_id) VALUES (1, 'D9')")
            .contains("code = FailedPrecondition desc = Foreign key constraint `fk_dept` is violated"));
        assert!(err(&mut conn, "INSERT INTO employees (emp_id, salary) VALUES (1, -5)")
            .contains("Check constraint `employees`.`ck_salary` is violated for key (1)"));
        conn.execute("INSERT INTO employees (emp_id, dept_id) VALUES (1, NULL)").unwrap();
    }

    #[test]
    fn test_delete_referenced_parent() {
        let mut conn = setup();
        conn.execute("INSERT INTO employees (emp_id, dept_id) VALUES (1, 'D1')").unwrap();
        assert!(err(&mut conn, "DELETE FROM departments WHERE dept_id = 'D1'")
            .contains("still referenced"));
        assert_eq!(conn.execute("DELETE FROM employees WHERE emp_id = 1").unwrap(), 1);
        assert_eq!(conn.execute("DELETE FROM departments WHERE dept_id = 'D1'").unwrap(), 1);
    }

    #[test]
    fn test_update() {
        let mut conn = setup();
        assert!(err(&mut conn, "UPDATE departments SET dept_name = 'x'").ends_with("UPDATE must have a WHERE clause"));
        assert!(err(&mut conn, "UPDATE departments SET dept_id = 'D2' WHERE TRUE").contains("primary key"));
        assert_eq!(
            conn.execute("UPDATE departments SET budget = 50000 WHERE dept_id = 'D1'").unwrap(),
            1
        );
        assert_eq!(conn.table_rows("departments").unwrap()[0][2], Value::Float(50000.0));
    }

    #[test]
    fn test_missing_table_and_column() {
        let mut conn = setup();
        assert_eq!(
            err(&mut conn, "INSERT INTO ghost (a) VALUES (1)"),
            "rpc error: code = InvalidArgument desc = Table not found: ghost"
        );
        assert!(err(&mut conn, "INSERT INTO departments (nope) VALUES (1)")
            .ends_with("Column not found in table departments: nope"));
    }
}
