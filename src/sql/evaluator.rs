/// Expression evaluator - evaluates expressions against memory-target rows
use super::ast::{is_aggregate_function, BinaryOperator, DataType, Expr, Literal, UnaryOperator};
use crate::types::Value;
use regex::Regex;
use std::cmp::Ordering;
use thiserror::Error;

/// Evaluation failure; the memory target reports these as `InvalidArgument`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Unrecognized name: {0}")]
    UnknownColumn(String),

    #[error("Column name {0} is ambiguous")]
    AmbiguousColumn(String),

    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("No parameter found for binding: {0}")]
    UnboundParameter(String),

    #[error("No matching signature for operator {op} for argument types: {left}, {right}")]
    NoMatchingSignature {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    #[error("Could not cast literal \"{value}\" to type {target}")]
    InvalidCast { value: String, target: String },

    #[error("Division by zero: {0} / 0")]
    DivisionByZero(String),

    #[error("Aggregate function {0} not allowed in this context")]
    AggregateNotAllowed(String),

    #[error("{0}")]
    Invalid(String),
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// One table (or view) contributing columns to a row
#[derive(Debug, Clone)]
pub struct ScopeSource {
    pub qualifier: String,
    pub columns: Vec<String>,
    pub offset: usize,
}

/// Column layout of the rows an expression is evaluated against
#[derive(Debug, Clone, Default)]
pub struct Scope {
    sources: Vec<ScopeSource>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(qualifier: impl Into<String>, columns: Vec<String>) -> Self {
        let mut scope = Self::new();
        scope.push(qualifier, columns);
        scope
    }

    pub fn push(&mut self, qualifier: impl Into<String>, columns: Vec<String>) {
        let offset = self.width();
        self.sources.push(ScopeSource {
            qualifier: qualifier.into(),
            columns,
            offset,
        });
    }

    /// Total number of columns
    pub fn width(&self) -> usize {
        self.sources.iter().map(|s| s.columns.len()).sum()
    }

    pub fn sources(&self) -> &[ScopeSource] {
        &self.sources
    }

    /// Flat index of `[table.]name`
    pub fn resolve(&self, table: Option<&str>, name: &str) -> EvalResult<usize> {
        let display = match table {
            Some(t) => format!("{}.{}", t, name),
            None => name.to_string(),
        };

        let mut found = None;
        for source in &self.sources {
            if let Some(t) = table {
                if !source.qualifier.eq_ignore_ascii_case(t) {
                    continue;
                }
            }
            if let Some(pos) = source
                .columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
            {
                if found.is_some() {
                    return Err(EvalError::AmbiguousColumn(display));
                }
                found = Some(source.offset + pos);
            }
        }

        found.ok_or(EvalError::UnknownColumn(display))
    }
}

/// Evaluates expressions; `commit_timestamp` backs CURRENT_TIMESTAMP() and friends
pub struct ExprEvaluator {
    commit_timestamp: String,
}

impl ExprEvaluator {
    pub fn new(commit_timestamp: impl Into<String>) -> Self {
        Self {
            commit_timestamp: commit_timestamp.into(),
        }
    }

    pub fn eval(&self, expr: &Expr, scope: &Scope, row: &[Value]) -> EvalResult<Value> {
        match expr {
            Expr::Literal(lit) => self.eval_literal(lit),

            Expr::Column { table, name } => {
                let idx = scope.resolve(table.as_deref(), name)?;
                Ok(row.get(idx).cloned().unwrap_or(Value::Null))
            }

            Expr::Param(name) => Err(EvalError::UnboundParameter(name.clone())),

            Expr::Function { name, args, .. } => {
                if is_aggregate_function(name) {
                    return Err(EvalError::AggregateNotAllowed(name.to_ascii_uppercase()));
                }
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg, scope, row))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.call_scalar(name, values)
            }

            Expr::BinaryOp { left, op, right } => {
                let l = self.eval(left, scope, row)?;
                let r = self.eval(right, scope, row)?;
                apply_binary(*op, l, r)
            }

            Expr::UnaryOp { op, expr } => {
                let value = self.eval(expr, scope, row)?;
                apply_unary(*op, value)
            }

            Expr::IsNull { expr, negated } => {
                let is_null = self.eval(expr, scope, row)?.is_null();
                Ok(Value::Bool(is_null != *negated))
            }

            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let needle = self.eval(expr, scope, row)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for item in list {
                    let candidate = self.eval(item, scope, row)?;
                    match compare_values("IN", &needle, &candidate)? {
                        Some(Ordering::Equal) => return Ok(Value::Bool(!*negated)),
                        None => saw_null = true,
                        _ => {}
                    }
                }
                if saw_null {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Bool(*negated))
                }
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = self.eval(expr, scope, row)?;
                let low = self.eval(low, scope, row)?;
                let high = self.eval(high, scope, row)?;
                let lower = compare_values("BETWEEN", &value, &low)?;
                let upper = compare_values("BETWEEN", &value, &high)?;
                match (lower, upper) {
                    (Some(l), Some(u)) => {
                        let inside = l != Ordering::Less && u != Ordering::Greater;
                        Ok(Value::Bool(inside != *negated))
                    }
                    _ => Ok(Value::Null),
                }
            }

            Expr::Like {
                expr,
                pattern,
                negated,
            } => {
                let value = self.eval(expr, scope, row)?;
                let pattern = self.eval(pattern, scope, row)?;
                match (value, pattern) {
                    (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                    (Value::Text(v), Value::Text(p)) => {
                        Ok(Value::Bool(like_match(&v, &p)? != *negated))
                    }
                    (v, p) => Err(EvalError::NoMatchingSignature {
                        op: "LIKE".into(),
                        left: v.type_name(),
                        right: p.type_name(),
                    }),
                }
            }

            Expr::Cast { expr, data_type } => {
                let value = self.eval(expr, scope, row)?;
                cast_value(value, data_type)
            }

            Expr::Case {
                branches,
                else_result,
            } => {
                for (condition, result) in branches {
                    if self.eval(condition, scope, row)? == Value::Bool(true) {
                        return self.eval(result, scope, row);
                    }
                }
                match else_result {
                    Some(expr) => self.eval(expr, scope, row),
                    None => Ok(Value::Null),
                }
            }
        }
    }

    /// WHERE / ON / CHECK semantics: only TRUE passes
    pub fn eval_predicate(&self, expr: &Expr, scope: &Scope, row: &[Value]) -> EvalResult<bool> {
        match self.eval(expr, scope, row)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(EvalError::Invalid(format!(
                "Expected type BOOL; found {}",
                other.type_name()
            ))),
        }
    }

    /// Evaluates an expression over one group of rows (aggregates fold the group)
    pub fn eval_grouped(&self, expr: &Expr, scope: &Scope, rows: &[&[Value]]) -> EvalResult<Value> {
        if !expr.contains_aggregate() {
            return match rows.first() {
                Some(row) => self.eval(expr, scope, row),
                None => self.eval(expr, scope, &vec![Value::Null; scope.width()]),
            };
        }

        match expr {
            Expr::Function {
                name,
                args,
                distinct,
                star,
            } if is_aggregate_function(name) => {
                self.aggregate(name, args, *distinct, *star, scope, rows)
            }
            Expr::BinaryOp { left, op, right } => {
                let l = self.eval_grouped(left, scope, rows)?;
                let r = self.eval_grouped(right, scope, rows)?;
                apply_binary(*op, l, r)
            }
            Expr::UnaryOp { op, expr } => apply_unary(*op, self.eval_grouped(expr, scope, rows)?),
            Expr::Cast { expr, data_type } => {
                cast_value(self.eval_grouped(expr, scope, rows)?, data_type)
            }
            Expr::IsNull { expr, negated } => {
                let is_null = self.eval_grouped(expr, scope, rows)?.is_null();
                Ok(Value::Bool(is_null != *negated))
            }
            _ => Err(EvalError::Invalid(
                "Aggregate functions are only supported in simple expressions".into(),
            )),
        }
    }

    fn aggregate(
        &self,
        name: &str,
        args: &[Expr],
        distinct: bool,
        star: bool,
        scope: &Scope,
        rows: &[&[Value]],
    ) -> EvalResult<Value> {
        let upper = name.to_ascii_uppercase();
        if star {
            return Ok(Value::Integer(rows.len() as i64));
        }
        if args.len() != 1 {
            return Err(EvalError::Invalid(format!(
                "Number of arguments does not match for aggregate function {}",
                upper
            )));
        }

        let mut values: Vec<Value> = Vec::new();
        for row in rows {
            let value = self.eval(&args[0], scope, row)?;
            if value.is_null() {
                continue;
            }
            if distinct && values.iter().any(|v| v == &value) {
                continue;
            }
            values.push(value);
        }

        match upper.as_str() {
            "COUNT" => Ok(Value::Integer(values.len() as i64)),
            "SUM" | "AVG" => {
                if values.is_empty() {
                    return Ok(Value::Null);
                }
                let all_int = values.iter().all(|v| matches!(v, Value::Integer(_)));
                let mut total = 0f64;
                let mut int_total = 0i64;
                for value in &values {
                    match value {
                        Value::Integer(i) => {
                            int_total = int_total.saturating_add(*i);
                            total += *i as f64;
                        }
                        Value::Float(f) => total += f,
                        other => {
                            return Err(EvalError::Invalid(format!(
                                "No matching signature for aggregate function {} for argument types: {}",
                                upper,
                                other.type_name()
                            )))
                        }
                    }
                }
                if upper == "AVG" {
                    Ok(Value::Float(total / values.len() as f64))
                } else if all_int {
                    Ok(Value::Integer(int_total))
                } else {
                    Ok(Value::Float(total))
                }
            }
            _ => {
                // MIN / MAX
                let want = if upper == "MIN" {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut best: Option<Value> = None;
                for value in values {
                    best = match best {
                        None => Some(value),
                        Some(current) => {
                            if compare_values(&upper, &value, &current)? == Some(want) {
                                Some(value)
                            } else {
                                Some(current)
                            }
                        }
                    };
                }
                Ok(best.unwrap_or(Value::Null))
            }
        }
    }

    fn eval_literal(&self, lit: &Literal) -> EvalResult<Value> {
        let value = match lit {
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) | Literal::Json(s) => Value::Text(s.clone()),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
            Literal::Date(s) => cast_value(Value::Text(s.clone()), &DataType::Date)?,
            Literal::Timestamp(s) => cast_value(Value::Text(s.clone()), &DataType::Timestamp)?,
            Literal::Numeric(s) => cast_value(Value::Text(s.clone()), &DataType::Numeric)?,
        };
        Ok(value)
    }

    fn call_scalar(&self, name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "GENERATE_UUID" => Ok(Value::Text(generate_uuid())),
            "CURRENT_TIMESTAMP" | "PENDING_COMMIT_TIMESTAMP" => {
                Ok(Value::Timestamp(self.commit_timestamp.clone()))
            }
            "CURRENT_DATE" => Ok(Value::Date(
                self.commit_timestamp.chars().take(10).collect(),
            )),
            "UPPER" | "LOWER" => match args.into_iter().next() {
                Some(Value::Text(s)) if upper == "UPPER" => Ok(Value::Text(s.to_uppercase())),
                Some(Value::Text(s)) => Ok(Value::Text(s.to_lowercase())),
                Some(Value::Null) | None => Ok(Value::Null),
                Some(other) => Err(EvalError::Invalid(format!(
                    "No matching signature for function {} for argument types: {}",
                    upper,
                    other.type_name()
                ))),
            },
            "CONCAT" => {
                if args.iter().any(Value::is_null) {
                    return Ok(Value::Null);
                }
                Ok(Value::Text(args.iter().map(|v| v.to_string()).collect()))
            }
            "LENGTH" | "CHAR_LENGTH" => match args.first() {
                Some(Value::Text(s)) => Ok(Value::Integer(s.chars().count() as i64)),
                _ => Ok(Value::Null),
            },
            "COALESCE" | "IFNULL" => Ok(args
                .into_iter()
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null)),
            _ => Err(EvalError::FunctionNotFound(upper)),
        }
    }
}

/// Applies a binary operator with SQL NULL semantics
pub fn apply_binary(op: BinaryOperator, left: Value, right: Value) -> EvalResult<Value> {
    match op {
        BinaryOperator::And => Ok(match (truth(&left, "AND")?, truth(&right, "AND")?) {
            (Some(false), _) | (_, Some(false)) => Value::Bool(false),
            (Some(true), Some(true)) => Value::Bool(true),
            _ => Value::Null,
        }),
        BinaryOperator::Or => Ok(match (truth(&left, "OR")?, truth(&right, "OR")?) {
            (Some(true), _) | (_, Some(true)) => Value::Bool(true),
            (Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        }),
        BinaryOperator::Eq
        | BinaryOperator::Ne
        | BinaryOperator::Lt
        | BinaryOperator::Le
        | BinaryOperator::Gt
        | BinaryOperator::Ge => {
            let ordering = match compare_values(op.symbol(), &left, &right)? {
                Some(ordering) => ordering,
                None => return Ok(Value::Null),
            };
            let result = match op {
                BinaryOperator::Eq => ordering == Ordering::Equal,
                BinaryOperator::Ne => ordering != Ordering::Equal,
                BinaryOperator::Lt => ordering == Ordering::Less,
                BinaryOperator::Le => ordering != Ordering::Greater,
                BinaryOperator::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOperator::Concat => match (left, right) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Text(l), Value::Text(r)) => Ok(Value::Text(l + &r)),
            (l, r) => Err(signature_error(op, &l, &r)),
        },
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide => arithmetic(op, left, right),
    }
}

fn arithmetic(op: BinaryOperator, left: Value, right: Value) -> EvalResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    if let (Value::Integer(l), Value::Integer(r)) = (&left, &right) {
        let result = match op {
            BinaryOperator::Plus => l.checked_add(*r),
            BinaryOperator::Minus => l.checked_sub(*r),
            BinaryOperator::Multiply => l.checked_mul(*r),
            _ => {
                if *r == 0 {
                    return Err(EvalError::DivisionByZero(l.to_string()));
                }
                return Ok(Value::Float(*l as f64 / *r as f64));
            }
        };
        return result
            .map(Value::Integer)
            .ok_or_else(|| EvalError::Invalid(format!("int64 overflow: {} {} {}", l, op.symbol(), r)));
    }

    let (l, r) = match (as_f64(&left), as_f64(&right)) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(signature_error(op, &left, &right)),
    };
    let result = match op {
        BinaryOperator::Plus => l + r,
        BinaryOperator::Minus => l - r,
        BinaryOperator::Multiply => l * r,
        _ => {
            if r == 0.0 {
                return Err(EvalError::DivisionByZero(l.to_string()));
            }
            l / r
        }
    };
    Ok(Value::Float(result))
}

fn apply_unary(op: UnaryOperator, value: Value) -> EvalResult<Value> {
    match (op, value) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOperator::Minus, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| EvalError::Invalid(format!("int64 overflow: -{}", i))),
        (UnaryOperator::Minus, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOperator::Not, other) => Err(EvalError::Invalid(format!(
            "No matching signature for operator NOT for argument types: {}",
            other.type_name()
        ))),
        (UnaryOperator::Minus, other) => Err(EvalError::Invalid(format!(
            "No matching signature for operator - for argument types: {}",
            other.type_name()
        ))),
    }
}

fn truth(value: &Value, op: &str) -> EvalResult<Option<bool>> {
    match value {
        Value::Bool(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(EvalError::Invalid(format!(
            "No matching signature for operator {} for argument types: {}",
            op,
            other.type_name()
        ))),
    }
}

fn signature_error(op: BinaryOperator, left: &Value, right: &Value) -> EvalError {
    EvalError::NoMatchingSignature {
        op: op.symbol().to_string(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// SQL comparison; `None` when either side is NULL
pub fn compare_values(op: &str, left: &Value, right: &Value) -> EvalResult<Option<Ordering>> {
    let ordering = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(None),
        (Value::Integer(l), Value::Integer(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (l, r) = (as_f64(left).unwrap_or(0.0), as_f64(right).unwrap_or(0.0));
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        // 字符串字面量可与 DATE / TIMESTAMP 比较
        (
            Value::Text(l) | Value::Date(l) | Value::Timestamp(l),
            Value::Text(r) | Value::Date(r) | Value::Timestamp(r),
        ) => l.cmp(r),
        _ => {
            return Err(EvalError::NoMatchingSignature {
                op: op.to_string(),
                left: left.type_name(),
                right: right.type_name(),
            })
        }
    };
    Ok(Some(ordering))
}

/// CAST semantics
pub fn cast_value(value: Value, target: &DataType) -> EvalResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let invalid = |v: &Value| EvalError::InvalidCast {
        value: v.to_string(),
        target: target.name(),
    };

    match target {
        DataType::Int64 => match &value {
            Value::Integer(_) => Ok(value),
            Value::Float(f) => Ok(Value::Integer(f.round() as i64)),
            Value::Bool(b) => Ok(Value::Integer(*b as i64)),
            Value::Text(s) => s.trim().parse::<i64>().map(Value::Integer).map_err(|_| invalid(&value)),
            _ => Err(invalid(&value)),
        },
        DataType::Float64 | DataType::Float32 | DataType::Numeric => match &value {
            Value::Integer(i) => Ok(Value::Float(*i as f64)),
            Value::Float(_) => Ok(value),
            Value::Text(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| invalid(&value)),
            _ => Err(invalid(&value)),
        },
        DataType::Bool => match &value {
            Value::Bool(_) => Ok(value),
            Value::Integer(i) => Ok(Value::Bool(*i != 0)),
            Value::Text(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::Text(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(invalid(&value)),
        },
        DataType::String(_) | DataType::Bytes(_) | DataType::Json => {
            Ok(Value::Text(value.to_string()))
        }
        DataType::Date => match &value {
            Value::Date(_) => Ok(value),
            Value::Text(s) | Value::Timestamp(s) => {
                let date: String = s.chars().take(10).collect();
                if is_valid_date(&date) && (s.len() == 10 || matches!(value, Value::Timestamp(_))) {
                    Ok(Value::Date(date))
                } else {
                    Err(invalid(&value))
                }
            }
            _ => Err(invalid(&value)),
        },
        DataType::Timestamp => match &value {
            Value::Timestamp(_) => Ok(value),
            Value::Date(d) => Ok(Value::Timestamp(format!("{}T00:00:00Z", d))),
            Value::Text(s) if is_valid_timestamp(s) => Ok(Value::Timestamp(s.clone())),
            _ => Err(invalid(&value)),
        },
        DataType::Other(name) => Err(EvalError::Invalid(format!("Type not found: {}", name))),
    }
}

/// `YYYY-MM-DD`
pub fn is_valid_date(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 3 || parts[0].len() != 4 || parts[1].len() != 2 || parts[2].len() != 2 {
        return false;
    }
    let nums: Vec<u32> = parts.iter().filter_map(|p| p.parse().ok()).collect();
    nums.len() == 3 && (1..=12).contains(&nums[1]) && (1..=31).contains(&nums[2])
}

/// Date optionally followed by `T` or space and a time part
pub fn is_valid_timestamp(s: &str) -> bool {
    let date: String = s.chars().take(10).collect();
    if !is_valid_date(&date) {
        return false;
    }
    match s[date.len()..].chars().next() {
        None => true,
        Some('T') | Some(' ') => s[date.len() + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn like_match(value: &str, pattern: &str) -> EvalResult<bool> {
    let mut re = String::from("(?s)^");
    for ch in pattern.chars() {
        match ch {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
        .map(|re| re.is_match(value))
        .map_err(|e| EvalError::Invalid(format!("Invalid LIKE pattern: {}", e)))
}

/// Random version-4 UUID string
pub fn generate_uuid() -> String {
    let mut bytes: [u8; 16] = rand::random();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::Parser;
    use crate::sql::Lexer;

    fn expr(sql: &str) -> Expr {
        let tokens = Lexer::new(sql).tokenize().unwrap();
        Parser::new(tokens).parse_expr(0).unwrap()
    }

    fn scope() -> Scope {
        Scope::single(
            "employees",
            vec!["emp_id".into(), "salary".into(), "dept_id".into()],
        )
    }

    #[test]
    fn test_eval_predicates() {
        let evaluator = ExprEvaluator::new("2024-01-01T00:00:00Z");
        let row = vec![Value::Integer(1), Value::Float(75000.0), Value::Null];

        assert!(evaluator.eval_predicate(&expr("salary > 50000 AND emp_id = 1"), &scope(), &row).unwrap());
        assert!(!evaluator.eval_predicate(&expr("dept_id = 1"), &scope(), &row).unwrap());
        assert!(evaluator.eval_predicate(&expr("dept_id IS NULL"), &scope(), &row).unwrap());
        assert!(evaluator.eval_predicate(&expr("emp_id IN (3, 2, 1)"), &scope(), &row).unwrap());
        assert!(evaluator.eval_predicate(&expr("employees.salary BETWEEN 1 AND 80000"), &scope(), &row).unwrap());
    }

    #[test]
    fn test_negation_overflow_is_an_error() {
        let evaluator = ExprEvaluator::new("2024-01-01T00:00:00Z");
        let row = vec![Value::Null; 3];

        let err = evaluator.eval(&expr("-(-9223372036854775807 - 1)"), &scope(), &row).unwrap_err();
        assert!(matches!(err, EvalError::Invalid(ref msg) if msg.contains("int64 overflow")), "{:?}", err);
        assert_eq!(
            evaluator.eval(&expr("-(-9223372036854775807)"), &scope(), &row),
            Ok(Value::Integer(i64::MAX))
        );
    }

    #[test]
    fn test_eval_errors() {
        let evaluator = ExprEvaluator::new("2024-01-01T00:00:00Z");
        let row = vec![Value::Null; 3];

        assert_eq!(
            evaluator.eval(&expr("NEXTVAL('seq')"), &scope(), &row),
            Err(EvalError::FunctionNotFound("NEXTVAL".into()))
        );
        assert_eq!(
            evaluator.eval(&expr("@dept_id"), &scope(), &row),
            Err(EvalError::UnboundParameter("dept_id".into()))
        );
        assert_eq!(
            evaluator.eval(&expr("missing"), &scope(), &row),
            Err(EvalError::UnknownColumn("missing".into()))
        );
        assert!(matches!(
            evaluator.eval(&expr("1 = 'a'"), &scope(), &row),
            Err(EvalError::NoMatchingSignature { .. })
        ));
    }

    #[test]
    fn test_eval_functions() {
        let evaluator = ExprEvaluator::new("2024-01-01T00:00:00Z");
        let row = vec![Value::Null; 3];

        let uuid = evaluator.eval(&expr("GENERATE_UUID()"), &scope(), &row).unwrap();
        match uuid {
            Value::Text(s) => assert_eq!(s.len(), 36),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            evaluator.eval(&expr("CURRENT_TIMESTAMP()"), &scope(), &row).unwrap(),
            Value::Timestamp("2024-01-01T00:00:00Z".into())
        );
        assert_eq!(
            evaluator.eval(&expr("DATE '2024-02-30'"), &scope(), &row).unwrap(),
            Value::Date("2024-02-30".into())
        );
        assert!(evaluator.eval(&expr("DATE 'soon'"), &scope(), &row).is_err());
    }

    #[test]
    fn test_eval_grouped_aggregates() {
        let evaluator = ExprEvaluator::new("2024-01-01T00:00:00Z");
        let rows = vec![
            vec![Value::Integer(1), Value::Float(10.0), Value::Integer(1)],
            vec![Value::Integer(2), Value::Float(30.0), Value::Null],
        ];
        let refs: Vec<&[Value]> = rows.iter().map(|r| r.as_slice()).collect();

        assert_eq!(evaluator.eval_grouped(&expr("COUNT(*)"), &scope(), &refs).unwrap(), Value::Integer(2));
        assert_eq!(evaluator.eval_grouped(&expr("COUNT(dept_id)"), &scope(), &refs).unwrap(), Value::Integer(1));
        assert_eq!(evaluator.eval_grouped(&expr("AVG(salary)"), &scope(), &refs).unwrap(), Value::Float(20.0));
        assert_eq!(evaluator.eval_grouped(&expr("MAX(emp_id) + 1"), &scope(), &refs).unwrap(), Value::Integer(3));
        assert_eq!(evaluator.eval_grouped(&expr("SUM(emp_id)"), &scope(), &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_like_and_timestamps() {
        assert!(like_match("Engineering", "Eng%").unwrap());
        assert!(like_match("a.b", "a_b").unwrap());
        assert!(!like_match("axb", "a.b").unwrap());
        assert!(is_valid_timestamp("2024-01-01T10:00:00Z"));
        assert!(is_valid_timestamp("2024-01-01"));
        assert!(!is_valid_timestamp("2024-01-01X"));
    }
}
