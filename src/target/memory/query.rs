/// Memory-target SELECT evaluation
use super::catalog::Catalog;
use super::{Failure, MemResult};
use crate::sql::ast::{Expr, JoinType, Literal, OrderByExpr, SelectItem, SelectStmt, TableRef};
use crate::sql::evaluator::{compare_values, EvalError, Scope};
use crate::types::{Row, Value};
use ahash::AHashSet;
use std::cmp::Ordering;

/// Views may read from views; deeper chains are rejected
const MAX_VIEW_DEPTH: usize = 16;

/// Rows of one FROM item
struct Source {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Catalog {
    /// Runs a query; returns output column names and rows
    pub fn select(&self, stmt: &SelectStmt) -> MemResult<(Vec<String>, Vec<Row>)> {
        self.run_select(stmt, 0)
    }

    fn run_select(&self, stmt: &SelectStmt, depth: usize) -> MemResult<(Vec<String>, Vec<Row>)> {
        if depth > MAX_VIEW_DEPTH {
            return Err(Failure::invalid("View definitions are nested too deeply"));
        }

        let (scope, rows) = self.joined_rows(stmt, depth)?;

        let mut filtered = Vec::with_capacity(rows.len());
        for row in rows {
            let keep = match &stmt.where_clause {
                Some(predicate) => self.evaluator.eval_predicate(predicate, &scope, &row)?,
                None => true,
            };
            if keep {
                filtered.push(row);
            }
        }

        let columns = output_columns(&stmt.items, &scope)?;
        let grouped = !stmt.group_by.is_empty()
            || stmt.having.is_some()
            || stmt.items.iter().any(|item| match item {
                SelectItem::Expr { expr, .. } => expr.contains_aggregate(),
                _ => false,
            });

        // (output row, sort keys)
        let mut entries: Vec<(Row, Vec<Value>)> = if grouped {
            self.project_groups(stmt, &scope, &filtered, &columns)?
        } else {
            let mut entries = Vec::with_capacity(filtered.len());
            for row in &filtered {
                let output = self.project_row(&stmt.items, &scope, row)?;
                let mut keys = Vec::with_capacity(stmt.order_by.len());
                for order in &stmt.order_by {
                    let key = match &order.expr {
                        Expr::Literal(Literal::Integer(_)) => {
                            output_reference(&order.expr, &columns, &output).ok_or_else(|| {
                                Failure::invalid("ORDER BY column number is out of range")
                            })?
                        }
                        expr => match self.evaluator.eval(expr, &scope, row) {
                            Ok(value) => value,
                            Err(e) => output_reference(expr, &columns, &output).ok_or(e)?,
                        },
                    };
                    keys.push(key);
                }
                entries.push((output, keys));
            }
            entries
        };

        if stmt.distinct {
            entries = apply_distinct(entries);
        }
        if !stmt.order_by.is_empty() {
            entries.sort_by(|a, b| compare_keys(&a.1, &b.1, &stmt.order_by));
        }

        let rows = entries
            .into_iter()
            .map(|(row, _)| row)
            .skip(stmt.offset.unwrap_or(0))
            .take(stmt.limit.unwrap_or(usize::MAX))
            .collect();
        Ok((columns, rows))
    }

    /// FROM plus joins, flattened into one row layout
    fn joined_rows(&self, stmt: &SelectStmt, depth: usize) -> MemResult<(Scope, Vec<Row>)> {
        let Some(from) = &stmt.from else {
            return Ok((Scope::new(), vec![Vec::new()]));
        };

        let first = self.load_source(from, depth)?;
        let mut scope = Scope::single(from.qualifier(), first.columns);
        let mut rows = first.rows;

        for join in &stmt.joins {
            let right = self.load_source(&join.table, depth)?;
            let left_width = scope.width();
            let right_width = right.columns.len();
            scope.push(join.table.qualifier(), right.columns);
            rows = self.join_rows(
                join.join_type,
                join.on.as_ref(),
                &scope,
                &rows,
                &right.rows,
                (left_width, right_width),
            )?;
        }
        Ok((scope, rows))
    }

    fn load_source(&self, table_ref: &TableRef, depth: usize) -> MemResult<Source> {
        if let Some(table) = self.tables.get(&table_ref.name) {
            return Ok(Source {
                columns: table.column_names(),
                rows: table.rows.clone(),
            });
        }
        if let Some(view) = self.views.get(&table_ref.name) {
            let (columns, rows) = self.run_select(&view.query, depth + 1)?;
            return Ok(Source { columns, rows });
        }
        Err(Failure::invalid(format!("Table not found: {}", table_ref.name)))
    }

    /// Nested loop join; outer sides pad the missing half with NULLs
    fn join_rows(
        &self,
        join_type: JoinType,
        on: Option<&Expr>,
        scope: &Scope,
        left: &[Row],
        right: &[Row],
        (left_width, right_width): (usize, usize),
    ) -> MemResult<Vec<Row>> {
        let mut result = Vec::new();
        let mut right_matched = vec![false; right.len()];

        for left_row in left {
            let mut matched = false;
            for (idx, right_row) in right.iter().enumerate() {
                let combined = combine_rows(left_row, right_row);
                let keep = match on {
                    Some(condition) => self.evaluator.eval_predicate(condition, scope, &combined)?,
                    None => true,
                };
                if keep {
                    result.push(combined);
                    matched = true;
                    right_matched[idx] = true;
                }
            }

            if !matched && matches!(join_type, JoinType::Left | JoinType::Full) {
                result.push(combine_rows(left_row, &vec![Value::Null; right_width]));
            }
        }

        if matches!(join_type, JoinType::Right | JoinType::Full) {
            for (idx, right_row) in right.iter().enumerate() {
                if !right_matched[idx] {
                    result.push(combine_rows(&vec![Value::Null; left_width], right_row));
                }
            }
        }

        Ok(result)
    }

    fn project_row(&self, items: &[SelectItem], scope: &Scope, row: &[Value]) -> MemResult<Row> {
        let mut output = Vec::with_capacity(items.len());
        for item in items {
            match item {
                SelectItem::Star => output.extend(row.iter().cloned()),
                SelectItem::QualifiedStar(qualifier) => {
                    let source = scope
                        .sources()
                        .iter()
                        .find(|s| s.qualifier.eq_ignore_ascii_case(qualifier))
                        .ok_or_else(|| EvalError::UnknownColumn(qualifier.clone()))?;
                    let end = source.offset + source.columns.len();
                    output.extend(row[source.offset..end].iter().cloned());
                }
                SelectItem::Expr { expr, .. } => output.push(self.evaluator.eval(expr, scope, row)?),
            }
        }
        Ok(output)
    }

    /// Projection used by THEN RETURN
    pub(super) fn project_rows(
        &self,
        items: &[SelectItem],
        scope: &Scope,
        rows: &[Row],
    ) -> MemResult<(Vec<String>, Vec<Row>)> {
        let columns = output_columns(items, scope)?;
        let rows = rows
            .iter()
            .map(|row| self.project_row(items, scope, row))
            .collect::<MemResult<Vec<_>>>()?;
        Ok((columns, rows))
    }

    /// GROUP BY / aggregate projection; one entry per group passing HAVING
    fn project_groups(
        &self,
        stmt: &SelectStmt,
        scope: &Scope,
        rows: &[Row],
        columns: &[String],
    ) -> MemResult<Vec<(Row, Vec<Value>)>> {
        let mut groups: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            let key = stmt
                .group_by
                .iter()
                .map(|e| self.evaluator.eval(e, scope, row))
                .collect::<Result<Vec<_>, _>>()?;
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(idx),
                None => groups.push((key, vec![idx])),
            }
        }
        // 无 GROUP BY 的聚合在空输入上仍返回一行
        if groups.is_empty() && stmt.group_by.is_empty() {
            groups.push((Vec::new(), Vec::new()));
        }

        let mut entries = Vec::with_capacity(groups.len());
        for (_, members) in groups {
            let group: Vec<&[Value]> = members.iter().map(|&i| rows[i].as_slice()).collect();

            if let Some(having) = &stmt.having {
                if self.evaluator.eval_grouped(having, scope, &group)? != Value::Bool(true) {
                    continue;
                }
            }

            let mut output = Vec::with_capacity(stmt.items.len());
            for item in &stmt.items {
                match item {
                    SelectItem::Expr { expr, .. } => {
                        output.push(self.evaluator.eval_grouped(expr, scope, &group)?)
                    }
                    _ => {
                        return Err(Failure::invalid(
                            "SELECT * cannot be combined with GROUP BY or aggregation",
                        ))
                    }
                }
            }

            let mut keys = Vec::with_capacity(stmt.order_by.len());
            for order in &stmt.order_by {
                let key = match output_reference(&order.expr, columns, &output) {
                    Some(value) => value,
                    None => self.evaluator.eval_grouped(&order.expr, scope, &group)?,
                };
                keys.push(key);
            }
            entries.push((output, keys));
        }
        Ok(entries)
    }
}

fn output_columns(items: &[SelectItem], scope: &Scope) -> MemResult<Vec<String>> {
    let mut columns = Vec::new();
    for item in items {
        match item {
            SelectItem::Star => {
                for source in scope.sources() {
                    columns.extend(source.columns.iter().cloned());
                }
            }
            SelectItem::QualifiedStar(qualifier) => {
                let source = scope
                    .sources()
                    .iter()
                    .find(|s| s.qualifier.eq_ignore_ascii_case(qualifier))
                    .ok_or_else(|| EvalError::UnknownColumn(qualifier.clone()))?;
                columns.extend(source.columns.iter().cloned());
            }
            SelectItem::Expr { expr, alias } => {
                let position = columns.len();
                columns.push(alias.clone().unwrap_or_else(|| expr.default_name(position)));
            }
        }
    }
    Ok(columns)
}

/// ORDER BY position (`ORDER BY 2`) or output alias
fn output_reference(expr: &Expr, columns: &[String], output: &[Value]) -> Option<Value> {
    match expr {
        Expr::Literal(Literal::Integer(n)) if *n >= 1 => output.get(*n as usize - 1).cloned(),
        Expr::Column { table: None, name } => columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| output.get(idx).cloned()),
        _ => None,
    }
}

fn combine_rows(left: &[Value], right: &[Value]) -> Row {
    let mut combined = Vec::with_capacity(left.len() + right.len());
    combined.extend_from_slice(left);
    combined.extend_from_slice(right);
    combined
}

fn apply_distinct(entries: Vec<(Row, Vec<Value>)>) -> Vec<(Row, Vec<Value>)> {
    let mut seen = AHashSet::new();
    entries
        .into_iter()
        .filter(|(row, _)| seen.insert(format!("{:?}", row)))
        .collect()
}

/// NULLs sort first ascending, last descending
fn compare_keys(left: &[Value], right: &[Value], order_by: &[OrderByExpr]) -> Ordering {
    for ((l, r), order) in left.iter().zip(right).zip(order_by) {
        let ordering = match (l.is_null(), r.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => compare_values("ORDER BY", l, r)
                .ok()
                .flatten()
                .unwrap_or(Ordering::Equal),
        };
        let ordering = if order.asc { ordering } else { ordering.reverse() };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
