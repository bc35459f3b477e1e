/// Abstract Syntax Tree for the GoogleSQL subset executed by the memory target

/// Top-level SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlStatement {
    CreateTable(CreateTableStmt),
    CreateIndex(CreateIndexStmt),
    CreateView(CreateViewStmt),
    CreateSequence(CreateSequenceStmt),
    Drop(DropStmt),
    AlterTable(AlterTableStmt),
    AlterDatabase(Vec<(String, Expr)>),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Select(SelectStmt),
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Star,                  // *
    QualifiedStar(String), // t.*
    Expr { expr: Expr, alias: Option<String> },
}

/// Table in FROM / JOIN: name [AS alias]
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// Name used to qualify columns
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub asc: bool,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: String,
    pub columns: Vec<String>,
    pub source: InsertSource,
    /// THEN RETURN items
    pub returning: Option<Vec<SelectItem>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Query(Box<SelectStmt>),
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table: String,
    pub where_clause: Option<Expr>,
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnSpec>,
    pub constraints: Vec<TableConstraint>,
    pub primary_key: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    pub not_null: bool,
    /// AUTO_INCREMENT or GENERATED BY DEFAULT AS IDENTITY
    pub identity: bool,
    /// Explicit sequence kind of an identity column
    pub sequence_kind: Option<String>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    ForeignKey {
        name: Option<String>,
        columns: Vec<String>,
        ref_table: String,
        ref_columns: Vec<String>,
    },
    Check {
        name: Option<String>,
        expr: Expr,
    },
}

/// Column types. Words outside the GoogleSQL vocabulary land in `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Int64,
    Float64,
    Float32,
    Numeric,
    Bool,
    String(Option<usize>),
    Bytes(Option<usize>),
    Date,
    Timestamp,
    Json,
    Other(String),
}

impl DataType {
    pub fn name(&self) -> String {
        match self {
            DataType::Int64 => "INT64".into(),
            DataType::Float64 => "FLOAT64".into(),
            DataType::Float32 => "FLOAT32".into(),
            DataType::Numeric => "NUMERIC".into(),
            DataType::Bool => "BOOL".into(),
            DataType::String(_) => "STRING".into(),
            DataType::Bytes(_) => "BYTES".into(),
            DataType::Date => "DATE".into(),
            DataType::Timestamp => "TIMESTAMP".into(),
            DataType::Json => "JSON".into(),
            DataType::Other(name) => name.clone(),
        }
    }

    /// Maximum length for sized STRING / BYTES columns
    pub fn max_length(&self) -> Option<usize> {
        match self {
            DataType::String(len) | DataType::Bytes(len) => *len,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStmt {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlSecurity {
    Invoker,
    Definer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateViewStmt {
    pub name: String,
    pub or_replace: bool,
    pub security: Option<SqlSecurity>,
    pub query: SelectStmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSequenceStmt {
    pub name: String,
    pub if_not_exists: bool,
    pub options: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Index,
    View,
    Sequence,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Table => "Table",
            ObjectKind::Index => "Index",
            ObjectKind::View => "View",
            ObjectKind::Sequence => "Sequence",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropStmt {
    pub kind: ObjectKind,
    pub name: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableAction {
    AddColumn { column: ColumnSpec, if_not_exists: bool },
    DropColumn(String),
    AddConstraint(TableConstraint),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableStmt {
    pub table: String,
    pub action: AlterTableAction,
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),

    /// Column reference: [table.]column
    Column { table: Option<String>, name: String },

    /// Unbound @name parameter
    Param(String),

    /// Function call; `star` marks COUNT(*)
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
        star: bool,
    },

    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
    },

    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },

    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },

    Cast {
        expr: Box<Expr>,
        data_type: DataType,
    },

    /// CASE WHEN cond THEN value ... [ELSE value] END
    Case {
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    Date(String),
    Timestamp(String),
    Json(String),
    Numeric(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
    Concat,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Concat => "||",
        }
    }

    /// Binding power for precedence climbing
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Le
            | BinaryOperator::Gt
            | BinaryOperator::Ge => 4,
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Concat => 5,
            BinaryOperator::Multiply | BinaryOperator::Divide => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column {
            table: None,
            name: name.into(),
        }
    }

    /// Whether the expression contains an aggregate call
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::Function { name, args, .. } => {
                is_aggregate_function(name) || args.iter().any(Expr::contains_aggregate)
            }
            Expr::BinaryOp { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expr::UnaryOp { expr, .. }
            | Expr::IsNull { expr, .. }
            | Expr::Cast { expr, .. } => expr.contains_aggregate(),
            Expr::InList { expr, list, .. } => {
                expr.contains_aggregate() || list.iter().any(Expr::contains_aggregate)
            }
            Expr::Between { expr, low, high, .. } => {
                expr.contains_aggregate() || low.contains_aggregate() || high.contains_aggregate()
            }
            Expr::Like { expr, pattern, .. } => {
                expr.contains_aggregate() || pattern.contains_aggregate()
            }
            Expr::Case { branches, else_result } => {
                branches
                    .iter()
                    .any(|(c, v)| c.contains_aggregate() || v.contains_aggregate())
                    || else_result.as_ref().is_some_and(|e| e.contains_aggregate())
            }
            Expr::Literal(_) | Expr::Column { .. } | Expr::Param(_) => false,
        }
    }

    /// Output column name when no alias is given
    pub fn default_name(&self, position: usize) -> String {
        match self {
            Expr::Column { name, .. } => name.clone(),
            _ => format!("${}", position + 1),
        }
    }
}

pub fn is_aggregate_function(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "COUNT" | "SUM" | "AVG" | "MIN" | "MAX"
    )
}
