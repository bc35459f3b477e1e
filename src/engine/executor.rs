//! Execution engine
//!
//! Runs one batch against one connection: DROP, CREATE, ordered INSERT,
//! SELECT, then everything else. Statement failures are recorded in the
//! [`ExecutionResult`]; only setup problems come back as `Err`.

use super::orderer::{insert_target, order_inserts};
use super::result::{ExecutionError, ExecutionResult, InsertId, InsertResult, OtherResult, QueryResult};
use super::synthesizer::ValueSynthesizer;
use crate::catalog::{IdentifierRegistry, SchemaTracker};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::sql::{clean_statement, leading_keyword};
use crate::target::{Connection, Repository};
use crate::types::{Kind, Statement};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

static CREATED_OBJECT_RE: OnceLock<Regex> = OnceLock::new();

fn created_object_re() -> &'static Regex {
    CREATED_OBJECT_RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\bCREATE\s+(?:OR\s+REPLACE\s+)?(?:UNIQUE\s+)?(?:NULL_FILTERED\s+)?(TABLE|INDEX|VIEW|SEQUENCE)\s+(?:IF\s+NOT\s+EXISTS\s+)?[`"]?(\w+)[`"]?"#,
        )
        .expect("valid CREATE object regex")
    })
}

/// Kind of schema object the engine created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Index,
    View,
    Sequence,
}

impl ObjectKind {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "TABLE" => Some(ObjectKind::Table),
            "INDEX" => Some(ObjectKind::Index),
            "VIEW" => Some(ObjectKind::View),
            "SEQUENCE" => Some(ObjectKind::Sequence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::Index => "INDEX",
            ObjectKind::View => "VIEW",
            ObjectKind::Sequence => "SEQUENCE",
        }
    }
}

/// Object registered for cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedObject {
    pub kind: ObjectKind,
    pub name: String,
}

impl CreatedObject {
    /// Object created by a CREATE statement, if the text names one
    pub fn from_create(sql: &str) -> Option<Self> {
        let caps = created_object_re().captures(sql)?;
        Some(Self {
            kind: ObjectKind::parse(caps.get(1)?.as_str())?,
            name: caps.get(2)?.as_str().to_string(),
        })
    }

    fn drop_sql(&self) -> String {
        format!("DROP {} IF EXISTS {}", self.kind.as_str(), self.name)
    }
}

impl fmt::Display for CreatedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.name)
    }
}

/// One statement of the batch: original text plus its cleaned, classified form
struct Pending {
    original: String,
    stmt: Statement,
}

impl AsRef<str> for Pending {
    fn as_ref(&self) -> &str {
        self.stmt.text()
    }
}

/// Buckets in execution order
#[derive(Default)]
struct Buckets {
    drops: Vec<Pending>,
    creates: Vec<Pending>,
    inserts: Vec<Pending>,
    selects: Vec<Pending>,
    others: Vec<Pending>,
}

/// Per-evaluation-unit engine.
///
/// Owns every piece of batch state (schema tracker, identifier registry,
/// created objects). Construct one per unit; it accepts exactly one batch.
pub struct ExecutionEngine<'c> {
    conn: &'c mut dyn Connection,
    repository: Option<&'c dyn Repository>,
    config: EngineConfig,
    schema: SchemaTracker,
    registry: IdentifierRegistry,
    created: Vec<CreatedObject>,
    executed: bool,
}

impl<'c> ExecutionEngine<'c> {
    /// Creates an engine over `conn`. Fails only on an invalid config.
    pub fn new(conn: &'c mut dyn Connection, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            conn,
            repository: None,
            config,
            schema: SchemaTracker::new(),
            registry: IdentifierRegistry::new(),
            created: Vec::new(),
            executed: false,
        })
    }

    /// Uses `repository.cleanup_db` instead of dropping tracked objects
    pub fn with_repository(mut self, repository: &'c dyn Repository) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schema(&self) -> &SchemaTracker {
        &self.schema
    }

    pub fn registry(&self) -> &IdentifierRegistry {
        &self.registry
    }

    /// Objects created by this engine, in creation order
    pub fn created_objects(&self) -> &[CreatedObject] {
        &self.created
    }

    /// Runs the batch. Second calls on the same engine fail with
    /// [`EngineError::AlreadyExecuted`].
    pub fn execute_statements<S: AsRef<str>>(&mut self, statements: &[S]) -> Result<ExecutionResult> {
        if self.executed {
            return Err(EngineError::AlreadyExecuted);
        }
        self.executed = true;

        let mut result = ExecutionResult::default();
        let mut buckets = Buckets::default();

        for raw in statements {
            let original = raw.as_ref();
            let cleaned = clean_statement(original);
            if cleaned.is_empty() {
                continue;
            }
            let pending = Pending {
                original: original.to_string(),
                stmt: Statement::new(cleaned),
            };
            result.total_statements += 1;
            match pending.stmt.kind() {
                Kind::Drop => {
                    result.drop_statements += 1;
                    buckets.drops.push(pending);
                }
                Kind::Create => {
                    result.create_statements += 1;
                    buckets.creates.push(pending);
                }
                Kind::Insert => {
                    result.insert_statements += 1;
                    buckets.inserts.push(pending);
                }
                Kind::Select => {
                    result.select_statements += 1;
                    buckets.selects.push(pending);
                }
                Kind::Update | Kind::Delete | Kind::Alter | Kind::Other => {
                    result.other_statements += 1;
                    buckets.others.push(pending);
                }
            }
        }

        info!(
            total = result.total_statements,
            drops = result.drop_statements,
            creates = result.create_statements,
            inserts = result.insert_statements,
            selects = result.select_statements,
            others = result.other_statements,
            "executing batch"
        );

        for pending in &buckets.drops {
            self.execute_drop(pending, &mut result);
        }
        for pending in &buckets.creates {
            self.execute_create(pending, &mut result);
        }

        order_inserts(&mut buckets.inserts, &self.config);
        for pending in &buckets.inserts {
            self.execute_insert(pending, &mut result);
        }

        for pending in &buckets.selects {
            self.execute_select(pending, &mut result);
        }
        for pending in &buckets.others {
            self.execute_other(pending, &mut result);
        }

        result.skipped_count = result.total_statements - result.executed_count;
        info!(
            executed = result.executed_count,
            skipped = result.skipped_count,
            errors = result.errors.len(),
            "batch finished"
        );
        Ok(result)
    }

    fn trace(&self, pending: &Pending) {
        if self.config.log_statement_text {
            debug!(kind = %pending.stmt.kind(), statement = %pending.stmt.text(), "executing statement");
        }
    }

    fn execute_drop(&mut self, pending: &Pending, result: &mut ExecutionResult) {
        self.trace(pending);
        match self.conn.execute(pending.stmt.text()) {
            Ok(_) => result.executed_count += 1,
            Err(e) if self.config.is_lenient_drop_error(e.message()) => {
                debug!(error = %e, "ignoring DROP of missing object");
                result.executed_count += 1;
            }
            Err(e) => {
                warn!(error = %e, "DROP failed");
                result.record_error(ExecutionError::new(Kind::Drop, &pending.original, e.message()));
            }
        }
    }

    fn execute_create(&mut self, pending: &Pending, result: &mut ExecutionResult) {
        self.trace(pending);
        let sql = pending.stmt.text();
        match self.conn.execute(sql) {
            Ok(_) => {
                result.executed_count += 1;
                self.schema.record_schema(sql);
                if let Some(object) = CreatedObject::from_create(sql) {
                    debug!(object = %object, "registered for cleanup");
                    self.created.push(object);
                }
            }
            Err(e) => {
                warn!(error = %e, "CREATE failed");
                result.record_error(ExecutionError::new(Kind::Create, &pending.original, e.message()));
            }
        }
    }

    fn execute_insert(&mut self, pending: &Pending, result: &mut ExecutionResult) {
        self.trace(pending);
        let target = insert_target(pending.stmt.text());
        let sql = ValueSynthesizer::new(&self.schema, &self.registry, &self.config)
            .populate_parameters(pending.stmt.text(), target.as_deref());

        let outcome = if self.config.has_returning_clause(&sql) {
            self.conn.query_row(&sql).map(|row| {
                match row.and_then(|r| r.into_iter().next()).filter(|v| !v.is_null()) {
                    Some(value) => InsertId::Generated(value.to_sql_literal_in(self.config.quote_style)),
                    None => InsertId::Success,
                }
            })
        } else {
            self.conn.execute(&sql).map(|_| InsertId::Success)
        };

        let record = match outcome {
            Ok(id) => {
                result.executed_count += 1;
                if let (InsertId::Generated(literal), Some(table)) = (&id, target.as_deref()) {
                    if self.config.is_identifier_table(table) {
                        self.registry.capture(table, literal.clone());
                    }
                }
                InsertResult {
                    statement: pending.original.clone(),
                    executed: sql,
                    id: Some(id),
                    error: None,
                }
            }
            Err(e) => {
                warn!(table = target.as_deref().unwrap_or(""), error = %e, "INSERT failed");
                result.record_error(ExecutionError::new(Kind::Insert, &pending.original, e.message()));
                InsertResult {
                    statement: pending.original.clone(),
                    executed: sql,
                    id: None,
                    error: Some(e.message().to_string()),
                }
            }
        };
        result.inserted_records.push(record);
    }

    fn execute_select(&mut self, pending: &Pending, result: &mut ExecutionResult) {
        self.trace(pending);
        let counted = self.conn.query(pending.stmt.text()).and_then(|rows| {
            let mut count = 0usize;
            for row in rows {
                row?;
                count += 1;
            }
            Ok(count)
        });

        let record = match counted {
            Ok(row_count) => {
                result.executed_count += 1;
                QueryResult {
                    statement: pending.original.clone(),
                    row_count,
                    error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "SELECT failed");
                result.record_error(ExecutionError::new(Kind::Select, &pending.original, e.message()));
                QueryResult {
                    statement: pending.original.clone(),
                    row_count: 0,
                    error: Some(e.message().to_string()),
                }
            }
        };
        result.query_results.push(record);
    }

    fn execute_other(&mut self, pending: &Pending, result: &mut ExecutionResult) {
        self.trace(pending);
        let keyword = leading_keyword(pending.stmt.text());
        let outcome = if self.config.supports_keyword(&keyword) {
            self.conn
                .execute(pending.stmt.text())
                .map_err(|e| e.message().to_string())
        } else {
            Err(format!("unsupported statement type: {}", keyword))
        };

        let record = match outcome {
            Ok(affected_rows) => {
                result.executed_count += 1;
                OtherResult {
                    statement: pending.original.clone(),
                    affected_rows,
                    error: None,
                }
            }
            Err(message) => {
                warn!(kind = %pending.stmt.kind(), error = %message, "statement failed");
                result.record_error(ExecutionError::new(pending.stmt.kind(), &pending.original, &message));
                OtherResult {
                    statement: pending.original.clone(),
                    affected_rows: 0,
                    error: Some(message),
                }
            }
        };
        result.other_results.push(record);
    }

    /// Tears down what this engine created.
    ///
    /// With a repository, delegates to its `cleanup_db`. Otherwise drops the
    /// tracked objects newest first with `IF EXISTS`; every drop is attempted
    /// and the first failure is returned. Calling it again is a no-op.
    pub fn cleanup(&mut self) -> Result<()> {
        if let Some(repository) = self.repository {
            self.created.clear();
            return repository
                .cleanup_db(&mut *self.conn)
                .map_err(|e| EngineError::Cleanup(e.to_string()));
        }

        let mut first_error: Option<EngineError> = None;
        for object in self.created.drain(..).rev() {
            match self.conn.execute(&object.drop_sql()) {
                Ok(_) => debug!(object = %object, "dropped"),
                Err(e) => {
                    warn!(object = %object, error = %e, "cleanup drop failed");
                    first_error.get_or_insert(EngineError::Cleanup(format!("dropping {}: {}", object, e)));
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
