/// SQL Parser - converts tokens into AST
use super::ast::*;
use super::token::{Token, TokenType};
use crate::error::{EngineError, Result};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, position: 0 }
    }

    /// Parse exactly one statement (an optional trailing `;` is allowed)
    pub fn parse(&mut self) -> Result<SqlStatement> {
        let stmt = if self.current().is_word("SELECT") {
            SqlStatement::Select(self.parse_select()?)
        } else if self.current().is_word("INSERT") {
            SqlStatement::Insert(self.parse_insert()?)
        } else if self.current().is_word("UPDATE") {
            SqlStatement::Update(self.parse_update()?)
        } else if self.current().is_word("DELETE") {
            SqlStatement::Delete(self.parse_delete()?)
        } else if self.current().is_word("CREATE") {
            self.parse_create()?
        } else if self.current().is_word("DROP") {
            SqlStatement::Drop(self.parse_drop()?)
        } else if self.current().is_word("ALTER") {
            self.parse_alter()?
        } else {
            return Err(self.unexpected());
        };

        self.match_token(&TokenType::Semicolon);
        if !matches!(self.current().token_type, TokenType::Eof) {
            return Err(self.expected("end of input"));
        }

        Ok(stmt)
    }

    // ---------------------------------------------------------------
    // DDL
    // ---------------------------------------------------------------

    fn parse_create(&mut self) -> Result<SqlStatement> {
        self.expect_word("CREATE")?;

        let or_replace = if self.match_word("OR") {
            self.expect_word("REPLACE")?;
            true
        } else {
            false
        };
        let unique = self.match_word("UNIQUE");
        self.match_word("NULL_FILTERED");

        if self.current().is_word("TABLE") && !or_replace && !unique {
            Ok(SqlStatement::CreateTable(self.parse_create_table()?))
        } else if self.current().is_word("INDEX") && !or_replace {
            Ok(SqlStatement::CreateIndex(self.parse_create_index(unique)?))
        } else if self.current().is_word("VIEW") && !unique {
            Ok(SqlStatement::CreateView(self.parse_create_view(or_replace)?))
        } else if self.current().is_word("SEQUENCE") && !or_replace && !unique {
            Ok(SqlStatement::CreateSequence(self.parse_create_sequence()?))
        } else {
            Err(self.expected("keyword TABLE"))
        }
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStmt> {
        self.expect_word("TABLE")?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_identifier()?;

        self.expect(TokenType::LParen)?;
        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        loop {
            if self.match_token(&TokenType::RParen) {
                break;
            }

            if self.match_word("CONSTRAINT") {
                let constraint_name = self.parse_identifier()?;
                constraints.push(self.parse_table_constraint(Some(constraint_name))?);
            } else if self.current().is_word("FOREIGN") || self.current().is_word("CHECK") {
                constraints.push(self.parse_table_constraint(None)?);
            } else if self.current().is_word("PRIMARY") {
                return Err(self.expected("column definition"));
            } else {
                columns.push(self.parse_column_spec()?);
            }

            if self.match_token(&TokenType::Comma) {
                continue;
            }
            if self.match_token(&TokenType::RParen) {
                break;
            }
            return Err(self.expected("')' or ','"));
        }

        self.expect_word("PRIMARY")?;
        self.expect_word("KEY")?;
        let primary_key = self.parse_key_list()?;

        // INTERLEAVE IN PARENT p [ON DELETE ...] / ROW DELETION POLICY (...)
        while self.match_token(&TokenType::Comma) {
            if self.match_word("INTERLEAVE") {
                self.expect_word("IN")?;
                self.expect_word("PARENT")?;
                self.parse_identifier()?;
                self.parse_on_delete()?;
            } else if self.match_word("ROW") {
                self.expect_word("DELETION")?;
                self.expect_word("POLICY")?;
                self.skip_parenthesized()?;
            } else {
                return Err(self.expected("keyword INTERLEAVE"));
            }
        }

        Ok(CreateTableStmt {
            name,
            if_not_exists,
            columns,
            constraints,
            primary_key,
        })
    }

    fn parse_column_spec(&mut self) -> Result<ColumnSpec> {
        let name = self.parse_identifier()?;
        let data_type = self.parse_data_type()?;

        let mut spec = ColumnSpec {
            name,
            data_type,
            not_null: false,
            identity: false,
            sequence_kind: None,
            default: None,
        };

        loop {
            if self.match_word("NOT") {
                self.expect_word("NULL")?;
                spec.not_null = true;
            } else if self.match_word("NULL") || self.match_word("HIDDEN") {
                continue;
            } else if self.match_word("AUTO_INCREMENT") {
                spec.identity = true;
            } else if self.match_word("GENERATED") {
                self.expect_word("BY")?;
                self.expect_word("DEFAULT")?;
                self.expect_word("AS")?;
                self.expect_word("IDENTITY")?;
                spec.identity = true;
                if self.match_token(&TokenType::LParen) {
                    let mut words = Vec::new();
                    while let TokenType::Word(w) = &self.current().token_type {
                        words.push(w.to_ascii_lowercase());
                        self.advance();
                    }
                    self.expect(TokenType::RParen)?;
                    if !words.is_empty() {
                        spec.sequence_kind = Some(words.join("_"));
                    }
                }
            } else if self.match_word("DEFAULT") {
                // 默认值必须带括号：DEFAULT (expr)
                self.expect(TokenType::LParen)?;
                spec.default = Some(self.parse_expr(0)?);
                self.expect(TokenType::RParen)?;
            } else if self.match_word("OPTIONS") {
                self.parse_options_body()?;
            } else {
                break;
            }
        }

        Ok(spec)
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let word = match &self.current().token_type {
            TokenType::Word(w) => w.to_ascii_uppercase(),
            _ => return Err(self.expected("type")),
        };
        self.advance();

        let data_type = match word.as_str() {
            "INT64" => DataType::Int64,
            "FLOAT64" => DataType::Float64,
            "FLOAT32" => DataType::Float32,
            "NUMERIC" => DataType::Numeric,
            "BOOL" => DataType::Bool,
            "DATE" => DataType::Date,
            "TIMESTAMP" => DataType::Timestamp,
            "JSON" => DataType::Json,
            "STRING" => DataType::String(self.parse_length()?),
            "BYTES" => DataType::Bytes(self.parse_length()?),
            "ARRAY" => {
                if self.match_token(&TokenType::Lt) {
                    let mut depth = 1;
                    while depth > 0 {
                        match self.current().token_type {
                            TokenType::Lt => depth += 1,
                            TokenType::Gt => depth -= 1,
                            TokenType::Eof => return Err(self.expected("'>'")),
                            _ => {}
                        }
                        self.advance();
                    }
                }
                DataType::Other(word)
            }
            _ => {
                if matches!(self.current().token_type, TokenType::LParen) {
                    self.skip_parenthesized()?;
                }
                DataType::Other(word)
            }
        };

        Ok(data_type)
    }

    /// `(n)` or `(MAX)` after STRING / BYTES
    fn parse_length(&mut self) -> Result<Option<usize>> {
        self.expect(TokenType::LParen)?;
        let length = match &self.current().token_type {
            TokenType::Number(n) => {
                let len = n
                    .parse::<usize>()
                    .map_err(|_| self.error(&format!("Invalid length {}", n)))?;
                Some(len)
            }
            TokenType::Word(w) if w.eq_ignore_ascii_case("MAX") => None,
            _ => return Err(self.expected("integer literal or MAX")),
        };
        self.advance();
        self.expect(TokenType::RParen)?;
        Ok(length)
    }

    fn parse_table_constraint(&mut self, name: Option<String>) -> Result<TableConstraint> {
        if self.match_word("FOREIGN") {
            self.expect_word("KEY")?;
            let columns = self.parse_key_list()?;
            self.expect_word("REFERENCES")?;
            let ref_table = self.parse_identifier()?;
            let ref_columns = self.parse_key_list()?;
            self.parse_on_delete()?;
            Ok(TableConstraint::ForeignKey {
                name,
                columns,
                ref_table,
                ref_columns,
            })
        } else if self.match_word("CHECK") {
            self.expect(TokenType::LParen)?;
            let expr = self.parse_expr(0)?;
            self.expect(TokenType::RParen)?;
            Ok(TableConstraint::Check { name, expr })
        } else {
            Err(self.expected("keyword FOREIGN or CHECK"))
        }
    }

    fn parse_on_delete(&mut self) -> Result<()> {
        if self.match_word("ON") {
            self.expect_word("DELETE")?;
            if !self.match_word("CASCADE") {
                self.expect_word("NO")?;
                self.expect_word("ACTION")?;
            }
        }
        Ok(())
    }

    fn parse_create_index(&mut self, unique: bool) -> Result<CreateIndexStmt> {
        self.expect_word("INDEX")?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_identifier()?;
        self.expect_word("ON")?;
        let table = self.parse_identifier()?;
        let columns = self.parse_key_list()?;

        if self.match_word("STORING") {
            self.parse_key_list()?;
        }
        if self.match_token(&TokenType::Comma) {
            self.expect_word("INTERLEAVE")?;
            self.expect_word("IN")?;
            self.parse_identifier()?;
        }

        Ok(CreateIndexStmt {
            name,
            table,
            columns,
            unique,
            if_not_exists,
        })
    }

    fn parse_create_view(&mut self, or_replace: bool) -> Result<CreateViewStmt> {
        self.expect_word("VIEW")?;
        let name = self.parse_identifier()?;

        let security = if self.match_word("SQL") {
            self.expect_word("SECURITY")?;
            if self.match_word("INVOKER") {
                Some(SqlSecurity::Invoker)
            } else if self.match_word("DEFINER") {
                Some(SqlSecurity::Definer)
            } else {
                return Err(self.expected("keyword INVOKER or DEFINER"));
            }
        } else {
            None
        };

        self.expect_word("AS")?;
        let parenthesized = self.match_token(&TokenType::LParen);
        let query = self.parse_select()?;
        if parenthesized {
            self.expect(TokenType::RParen)?;
        }

        Ok(CreateViewStmt {
            name,
            or_replace,
            security,
            query,
        })
    }

    fn parse_create_sequence(&mut self) -> Result<CreateSequenceStmt> {
        self.expect_word("SEQUENCE")?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_identifier()?;
        let options = if self.match_word("OPTIONS") {
            self.parse_options_body()?
        } else {
            Vec::new()
        };
        Ok(CreateSequenceStmt {
            name,
            if_not_exists,
            options,
        })
    }

    fn parse_drop(&mut self) -> Result<DropStmt> {
        self.expect_word("DROP")?;
        let kind = if self.match_word("TABLE") {
            ObjectKind::Table
        } else if self.match_word("INDEX") {
            ObjectKind::Index
        } else if self.match_word("VIEW") {
            ObjectKind::View
        } else if self.match_word("SEQUENCE") {
            ObjectKind::Sequence
        } else {
            return Err(self.expected("keyword TABLE"));
        };

        let if_exists = if self.match_word("IF") {
            self.expect_word("EXISTS")?;
            true
        } else {
            false
        };
        let name = self.parse_identifier()?;

        Ok(DropStmt {
            kind,
            name,
            if_exists,
        })
    }

    fn parse_alter(&mut self) -> Result<SqlStatement> {
        self.expect_word("ALTER")?;

        if self.match_word("DATABASE") {
            self.parse_identifier()?;
            self.expect_word("SET")?;
            self.expect_word("OPTIONS")?;
            return Ok(SqlStatement::AlterDatabase(self.parse_options_body()?));
        }

        self.expect_word("TABLE")?;
        let table = self.parse_identifier()?;

        let action = if self.match_word("ADD") {
            if self.match_word("CONSTRAINT") {
                let name = self.parse_identifier()?;
                AlterTableAction::AddConstraint(self.parse_table_constraint(Some(name))?)
            } else if self.current().is_word("FOREIGN") || self.current().is_word("CHECK") {
                AlterTableAction::AddConstraint(self.parse_table_constraint(None)?)
            } else {
                self.match_word("COLUMN");
                let if_not_exists = self.parse_if_not_exists()?;
                AlterTableAction::AddColumn {
                    column: self.parse_column_spec()?,
                    if_not_exists,
                }
            }
        } else if self.match_word("DROP") {
            self.match_word("COLUMN");
            AlterTableAction::DropColumn(self.parse_identifier()?)
        } else {
            return Err(self.expected("keyword ADD or DROP"));
        };

        Ok(SqlStatement::AlterTable(AlterTableStmt { table, action }))
    }

    /// `( name = expr, ... )`
    fn parse_options_body(&mut self) -> Result<Vec<(String, Expr)>> {
        self.expect(TokenType::LParen)?;
        let mut options = Vec::new();
        if self.match_token(&TokenType::RParen) {
            return Ok(options);
        }
        loop {
            let key = self.parse_identifier()?;
            self.expect(TokenType::Eq)?;
            let value = self.parse_expr(0)?;
            options.push((key, value));
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(options)
    }

    fn parse_if_not_exists(&mut self) -> Result<bool> {
        if self.match_word("IF") {
            self.expect_word("NOT")?;
            self.expect_word("EXISTS")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    // ---------------------------------------------------------------
    // DML
    // ---------------------------------------------------------------

    fn parse_insert(&mut self) -> Result<InsertStmt> {
        self.expect_word("INSERT")?;
        if self.match_word("OR") {
            if !self.match_word("IGNORE") {
                self.expect_word("UPDATE")?;
            }
        }
        self.match_word("INTO");
        let table = self.parse_identifier()?;

        // 列清单是必需的
        let columns = self.parse_identifier_list()?;

        let source = if self.match_word("VALUES") {
            let mut rows = Vec::new();
            loop {
                self.expect(TokenType::LParen)?;
                rows.push(self.parse_expr_list()?);
                self.expect(TokenType::RParen)?;
                if !self.match_token(&TokenType::Comma) {
                    break;
                }
            }
            InsertSource::Values(rows)
        } else if self.current().is_word("SELECT") {
            InsertSource::Query(Box::new(self.parse_select()?))
        } else {
            return Err(self.expected("keyword VALUES"));
        };

        let returning = self.parse_then_return()?;

        Ok(InsertStmt {
            table,
            columns,
            source,
            returning,
        })
    }

    fn parse_update(&mut self) -> Result<UpdateStmt> {
        self.expect_word("UPDATE")?;
        let table = self.parse_identifier()?;
        self.parse_optional_alias()?;
        self.expect_word("SET")?;

        let mut assignments = Vec::new();
        loop {
            let mut column = self.parse_identifier()?;
            if self.match_token(&TokenType::Dot) {
                column = self.parse_identifier()?;
            }
            self.expect(TokenType::Eq)?;
            let value = self.parse_expr(0)?;
            assignments.push((column, value));
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }

        let where_clause = if self.match_word("WHERE") {
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        self.parse_then_return()?;

        Ok(UpdateStmt {
            table,
            assignments,
            where_clause,
        })
    }

    fn parse_delete(&mut self) -> Result<DeleteStmt> {
        self.expect_word("DELETE")?;
        self.match_word("FROM");
        let table = self.parse_identifier()?;
        self.parse_optional_alias()?;

        let where_clause = if self.match_word("WHERE") {
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        self.parse_then_return()?;

        Ok(DeleteStmt {
            table,
            where_clause,
        })
    }

    fn parse_then_return(&mut self) -> Result<Option<Vec<SelectItem>>> {
        if self.match_word("THEN") {
            self.expect_word("RETURN")?;
            Ok(Some(self.parse_select_items()?))
        } else {
            Ok(None)
        }
    }

    // ---------------------------------------------------------------
    // SELECT
    // ---------------------------------------------------------------

    fn parse_select(&mut self) -> Result<SelectStmt> {
        self.expect_word("SELECT")?;

        let distinct = self.match_word("DISTINCT");
        if !distinct {
            self.match_word("ALL");
        }

        let items = self.parse_select_items()?;

        let mut from = None;
        let mut joins = Vec::new();
        if self.match_word("FROM") {
            let table = self.parse_table_ref()?;
            let left = table.qualifier().to_string();
            from = Some(table);
            while let Some(join) = self.parse_join(&left)? {
                joins.push(join);
            }
        }

        let where_clause = if self.match_word("WHERE") {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        let group_by = if self.match_word("GROUP") {
            self.expect_word("BY")?;
            self.parse_expr_list()?
        } else {
            Vec::new()
        };

        let having = if self.match_word("HAVING") {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.match_word("ORDER") {
            self.expect_word("BY")?;
            loop {
                let expr = self.parse_expr(0)?;
                let asc = if self.match_word("DESC") {
                    false
                } else {
                    self.match_word("ASC");
                    true
                };
                order_by.push(OrderByExpr { expr, asc });
                if !self.match_token(&TokenType::Comma) {
                    break;
                }
            }
        }

        let limit = if self.match_word("LIMIT") {
            Some(self.parse_usize()?)
        } else {
            None
        };

        let offset = if self.match_word("OFFSET") {
            Some(self.parse_usize()?)
        } else {
            None
        };

        Ok(SelectStmt {
            distinct,
            items,
            from,
            joins,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();
        loop {
            if self.match_token(&TokenType::Star) {
                items.push(SelectItem::Star);
            } else if self.is_qualified_star() {
                let qualifier = self.parse_identifier()?;
                self.advance(); // .
                self.advance(); // *
                items.push(SelectItem::QualifiedStar(qualifier));
            } else {
                let expr = self.parse_expr(0)?;
                let alias = self.parse_optional_alias()?;
                items.push(SelectItem::Expr { expr, alias });
            }

            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn is_qualified_star(&self) -> bool {
        matches!(
            self.current().token_type,
            TokenType::Word(_) | TokenType::QuotedIdent(_)
        ) && matches!(self.peek(1).token_type, TokenType::Dot)
            && matches!(self.peek(2).token_type, TokenType::Star)
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.parse_identifier()?;
        let alias = self.parse_optional_alias()?;
        Ok(TableRef { name, alias })
    }

    /// `[AS] alias`, where a bare alias must not be a keyword
    fn parse_optional_alias(&mut self) -> Result<Option<String>> {
        if self.match_word("AS") {
            return Ok(Some(self.parse_identifier()?));
        }
        match &self.current().token_type {
            TokenType::Word(w) if !TokenType::is_keyword(w) => {
                let alias = w.to_ascii_lowercase();
                self.advance();
                Ok(Some(alias))
            }
            TokenType::QuotedIdent(w) => {
                let alias = w.to_ascii_lowercase();
                self.advance();
                Ok(Some(alias))
            }
            _ => Ok(None),
        }
    }

    /// `left` qualifies the left-hand side of USING columns
    fn parse_join(&mut self, left: &str) -> Result<Option<Join>> {
        let join_type = if self.match_token(&TokenType::Comma) {
            let table = self.parse_table_ref()?;
            return Ok(Some(Join {
                join_type: JoinType::Cross,
                table,
                on: None,
            }));
        } else if self.match_word("JOIN") {
            JoinType::Inner
        } else if self.match_word("INNER") {
            self.expect_word("JOIN")?;
            JoinType::Inner
        } else if self.match_word("CROSS") {
            self.expect_word("JOIN")?;
            JoinType::Cross
        } else if self.match_word("LEFT") {
            self.match_word("OUTER");
            self.expect_word("JOIN")?;
            JoinType::Left
        } else if self.match_word("RIGHT") {
            self.match_word("OUTER");
            self.expect_word("JOIN")?;
            JoinType::Right
        } else if self.match_word("FULL") {
            self.match_word("OUTER");
            self.expect_word("JOIN")?;
            JoinType::Full
        } else {
            return Ok(None);
        };

        let table = self.parse_table_ref()?;
        let on = if join_type == JoinType::Cross {
            None
        } else if self.match_word("ON") {
            Some(self.parse_expr(0)?)
        } else if self.match_word("USING") {
            let columns = self.parse_identifier_list()?;
            let right = table.qualifier().to_string();
            let mut condition: Option<Expr> = None;
            for column in columns {
                let eq = Expr::BinaryOp {
                    left: Box::new(Expr::Column {
                        table: Some(left.to_string()),
                        name: column.clone(),
                    }),
                    op: BinaryOperator::Eq,
                    right: Box::new(Expr::Column {
                        table: Some(right.clone()),
                        name: column,
                    }),
                };
                condition = Some(match condition {
                    Some(prev) => Expr::BinaryOp {
                        left: Box::new(prev),
                        op: BinaryOperator::And,
                        right: Box::new(eq),
                    },
                    None => eq,
                });
            }
            condition
        } else {
            return Err(self.expected("keyword ON"));
        };

        Ok(Some(Join {
            join_type,
            table,
            on,
        }))
    }

    // ---------------------------------------------------------------
    // Expressions (precedence climbing)
    // ---------------------------------------------------------------

    pub fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left = self.parse_prefix_expr()?;

        loop {
            // IS / IN / BETWEEN / LIKE bind like comparisons
            if min_precedence <= 4 {
                if let Some(expr) = self.parse_comparison_suffix(&left)? {
                    left = expr;
                    continue;
                }
            }

            let op = match self.try_parse_binary_op() {
                Some(op) if op.precedence() >= min_precedence => op,
                _ => break,
            };
            self.advance();
            let right = self.parse_expr(op.precedence() + 1)?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_comparison_suffix(&mut self, left: &Expr) -> Result<Option<Expr>> {
        if self.match_word("IS") {
            let negated = self.match_word("NOT");
            self.expect_word("NULL")?;
            return Ok(Some(Expr::IsNull {
                expr: Box::new(left.clone()),
                negated,
            }));
        }

        let negated = self.current().is_word("NOT")
            && (self.peek(1).is_word("IN")
                || self.peek(1).is_word("BETWEEN")
                || self.peek(1).is_word("LIKE"));
        if negated {
            self.advance();
        }

        if self.match_word("IN") {
            self.expect(TokenType::LParen)?;
            let list = self.parse_expr_list()?;
            self.expect(TokenType::RParen)?;
            return Ok(Some(Expr::InList {
                expr: Box::new(left.clone()),
                list,
                negated,
            }));
        }
        if self.match_word("BETWEEN") {
            let low = self.parse_expr(5)?;
            self.expect_word("AND")?;
            let high = self.parse_expr(5)?;
            return Ok(Some(Expr::Between {
                expr: Box::new(left.clone()),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            }));
        }
        if self.match_word("LIKE") {
            let pattern = self.parse_expr(5)?;
            return Ok(Some(Expr::Like {
                expr: Box::new(left.clone()),
                pattern: Box::new(pattern),
                negated,
            }));
        }

        Ok(None)
    }

    fn parse_prefix_expr(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        match token.token_type {
            TokenType::Minus => {
                self.advance();
                let expr = self.parse_expr(7)?;
                Ok(match expr {
                    Expr::Literal(Literal::Integer(i)) => Expr::Literal(Literal::Integer(-i)),
                    Expr::Literal(Literal::Float(f)) => Expr::Literal(Literal::Float(-f)),
                    other => Expr::UnaryOp {
                        op: UnaryOperator::Minus,
                        expr: Box::new(other),
                    },
                })
            }
            TokenType::Plus => {
                self.advance();
                self.parse_expr(7)
            }
            TokenType::LParen => {
                self.advance();
                if self.current().is_word("SELECT") {
                    return Err(self.unexpected());
                }
                let expr = self.parse_expr(0)?;
                self.expect(TokenType::RParen)?;
                Ok(expr)
            }
            TokenType::Number(raw) => {
                self.advance();
                if let Ok(i) = raw.parse::<i64>() {
                    Ok(Expr::Literal(Literal::Integer(i)))
                } else {
                    raw.parse::<f64>()
                        .map(|f| Expr::Literal(Literal::Float(f)))
                        .map_err(|_| self.error(&format!("Invalid number {}", raw)))
                }
            }
            TokenType::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenType::Param(name) => {
                self.advance();
                Ok(Expr::Param(name))
            }
            TokenType::Positional(_) => Err(self.unexpected()),
            TokenType::QuotedIdent(name) => {
                self.advance();
                self.parse_column_ref(name.to_ascii_lowercase())
            }
            TokenType::Word(word) => self.parse_word_expr(&word),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_word_expr(&mut self, word: &str) -> Result<Expr> {
        let upper = word.to_ascii_uppercase();

        match upper.as_str() {
            "TRUE" | "FALSE" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Bool(upper == "TRUE")));
            }
            "NULL" => {
                self.advance();
                return Ok(Expr::Literal(Literal::Null));
            }
            "NOT" => {
                self.advance();
                let expr = self.parse_expr(3)?;
                return Ok(Expr::UnaryOp {
                    op: UnaryOperator::Not,
                    expr: Box::new(expr),
                });
            }
            "DATE" | "TIMESTAMP" | "JSON" | "NUMERIC" => {
                if let TokenType::String(s) = &self.peek(1).token_type {
                    let value = s.clone();
                    self.advance();
                    self.advance();
                    let literal = match upper.as_str() {
                        "DATE" => Literal::Date(value),
                        "TIMESTAMP" => Literal::Timestamp(value),
                        "JSON" => Literal::Json(value),
                        _ => Literal::Numeric(value),
                    };
                    return Ok(Expr::Literal(literal));
                }
            }
            "CAST" => {
                self.advance();
                self.expect(TokenType::LParen)?;
                let expr = self.parse_expr(0)?;
                self.expect_word("AS")?;
                let data_type = self.parse_data_type()?;
                self.expect(TokenType::RParen)?;
                return Ok(Expr::Cast {
                    expr: Box::new(expr),
                    data_type,
                });
            }
            "CASE" => {
                self.advance();
                return self.parse_case();
            }
            "CURRENT_TIMESTAMP" | "CURRENT_DATE"
                if !matches!(self.peek(1).token_type, TokenType::LParen) =>
            {
                self.advance();
                return Ok(Expr::Function {
                    name: upper.clone(),
                    args: Vec::new(),
                    distinct: false,
                    star: false,
                });
            }
            _ => {}
        }

        if matches!(self.peek(1).token_type, TokenType::LParen) && !TokenType::is_reserved(word) {
            self.advance();
            self.advance();
            return self.parse_function_call(upper);
        }

        if TokenType::is_reserved(word) {
            return Err(self.unexpected());
        }

        self.advance();
        self.parse_column_ref(word.to_ascii_lowercase())
    }

    fn parse_column_ref(&mut self, first: String) -> Result<Expr> {
        if self.match_token(&TokenType::Dot) {
            let name = self.parse_identifier()?;
            Ok(Expr::Column {
                table: Some(first),
                name,
            })
        } else {
            Ok(Expr::Column {
                table: None,
                name: first,
            })
        }
    }

    /// Arguments after `name(`
    fn parse_function_call(&mut self, name: String) -> Result<Expr> {
        if self.match_token(&TokenType::Star) {
            self.expect(TokenType::RParen)?;
            return Ok(Expr::Function {
                name,
                args: Vec::new(),
                distinct: false,
                star: true,
            });
        }

        let distinct = self.match_word("DISTINCT");
        let args = if matches!(self.current().token_type, TokenType::RParen) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.expect(TokenType::RParen)?;

        Ok(Expr::Function {
            name,
            args,
            distinct,
            star: false,
        })
    }

    fn parse_case(&mut self) -> Result<Expr> {
        let mut branches = Vec::new();
        while self.match_word("WHEN") {
            let condition = self.parse_expr(0)?;
            self.expect_word("THEN")?;
            let value = self.parse_expr(0)?;
            branches.push((condition, value));
        }
        if branches.is_empty() {
            return Err(self.expected("keyword WHEN"));
        }
        let else_result = if self.match_word("ELSE") {
            Some(Box::new(self.parse_expr(0)?))
        } else {
            None
        };
        self.expect_word("END")?;
        Ok(Expr::Case {
            branches,
            else_result,
        })
    }

    fn try_parse_binary_op(&self) -> Option<BinaryOperator> {
        let op = match &self.current().token_type {
            TokenType::Eq => BinaryOperator::Eq,
            TokenType::Ne => BinaryOperator::Ne,
            TokenType::Lt => BinaryOperator::Lt,
            TokenType::Le => BinaryOperator::Le,
            TokenType::Gt => BinaryOperator::Gt,
            TokenType::Ge => BinaryOperator::Ge,
            TokenType::Plus => BinaryOperator::Plus,
            TokenType::Minus => BinaryOperator::Minus,
            TokenType::Star => BinaryOperator::Multiply,
            TokenType::Slash => BinaryOperator::Divide,
            TokenType::Concat => BinaryOperator::Concat,
            TokenType::Word(w) if w.eq_ignore_ascii_case("AND") => BinaryOperator::And,
            TokenType::Word(w) if w.eq_ignore_ascii_case("OR") => BinaryOperator::Or,
            _ => return None,
        };
        Some(op)
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    fn parse_identifier(&mut self) -> Result<String> {
        let name = match &self.current().token_type {
            TokenType::Word(w) if !TokenType::is_reserved(w) => w.to_ascii_lowercase(),
            TokenType::QuotedIdent(w) => w.to_ascii_lowercase(),
            _ => return Err(self.expected("identifier")),
        };
        self.advance();
        Ok(name)
    }

    /// `(a, b, c)`
    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        self.expect(TokenType::LParen)?;
        let mut names = Vec::new();
        loop {
            names.push(self.parse_identifier()?);
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(names)
    }

    /// `(a [ASC|DESC], ...)`, possibly empty
    fn parse_key_list(&mut self) -> Result<Vec<String>> {
        self.expect(TokenType::LParen)?;
        let mut names = Vec::new();
        if self.match_token(&TokenType::RParen) {
            return Ok(names);
        }
        loop {
            names.push(self.parse_identifier()?);
            if !self.match_word("ASC") {
                self.match_word("DESC");
            }
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(names)
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_expr(0)?);
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        Ok(exprs)
    }

    fn parse_usize(&mut self) -> Result<usize> {
        if let TokenType::Number(raw) = &self.current().token_type {
            if let Ok(n) = raw.parse::<usize>() {
                self.advance();
                return Ok(n);
            }
        }
        Err(self.expected("integer literal"))
    }

    fn skip_parenthesized(&mut self) -> Result<()> {
        self.expect(TokenType::LParen)?;
        let mut depth = 1;
        while depth > 0 {
            match self.current().token_type {
                TokenType::LParen => depth += 1,
                TokenType::RParen => depth -= 1,
                TokenType::Eof => return Err(self.expected("')'")),
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &Token {
        let idx = (self.position + offset).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn match_token(&mut self, token_type: &TokenType) -> bool {
        if &self.current().token_type == token_type {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_word(&mut self, keyword: &str) -> bool {
        if self.current().is_word(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType) -> Result<()> {
        if self.match_token(&token_type) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{}'", token_type.symbol())))
        }
    }

    fn expect_word(&mut self, keyword: &str) -> Result<()> {
        if self.match_word(keyword) {
            Ok(())
        } else {
            Err(self.expected(&format!("keyword {}", keyword)))
        }
    }

    fn expected(&self, what: &str) -> EngineError {
        self.error(&format!("Expected {} but got {}", what, self.current().describe()))
    }

    fn unexpected(&self) -> EngineError {
        self.error(&format!("Unexpected {}", self.current().describe()))
    }

    fn error(&self, msg: &str) -> EngineError {
        let token = self.current();
        EngineError::ParseError(format!("{} [at {}:{}]", msg, token.line, token.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parse_sql;

    fn parse_err(sql: &str) -> String {
        match parse_sql(sql) {
            Err(EngineError::ParseError(msg)) => msg,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_table() {
        let sql = "CREATE TABLE employees (
            emp_id INT64 NOT NULL AUTO_INCREMENT,
            first_name STRING(50) NOT NULL,
            dept_id INT64,
            created_at TIMESTAMP DEFAULT (CURRENT_TIMESTAMP()),
            CONSTRAINT fk_dept FOREIGN KEY (dept_id) REFERENCES departments (dept_id),
            CHECK (emp_id > 0)
        ) PRIMARY KEY (emp_id)";

        match parse_sql(sql).unwrap() {
            SqlStatement::CreateTable(stmt) => {
                assert_eq!(stmt.name, "employees");
                assert_eq!(stmt.columns.len(), 4);
                assert!(stmt.columns[0].identity);
                assert_eq!(stmt.columns[1].data_type, DataType::String(Some(50)));
                assert!(stmt.columns[3].default.is_some());
                assert_eq!(stmt.constraints.len(), 2);
                assert_eq!(stmt.primary_key, vec!["emp_id".to_string()]);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_parse_insert_then_return() {
        let sql = "INSERT INTO departments (dept_name, location) VALUES ('Eng', 'NY'), ('Ops', 'SF') THEN RETURN dept_id";
        match parse_sql(sql).unwrap() {
            SqlStatement::Insert(stmt) => {
                assert_eq!(stmt.columns, vec!["dept_name", "location"]);
                match stmt.source {
                    InsertSource::Values(rows) => assert_eq!(rows.len(), 2),
                    other => panic!("unexpected source {:?}", other),
                }
                assert_eq!(stmt.returning.map(|r| r.len()), Some(1));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_parse_select_with_join() {
        let sql = "SELECT e.first_name, d.dept_name, COUNT(*) AS n FROM employees e \
                   LEFT JOIN departments AS d ON e.dept_id = d.dept_id \
                   WHERE e.salary BETWEEN 1 AND 100 AND d.location IS NOT NULL \
                   GROUP BY e.first_name, d.dept_name ORDER BY n DESC LIMIT 10";
        match parse_sql(sql).unwrap() {
            SqlStatement::Select(stmt) => {
                assert_eq!(stmt.items.len(), 3);
                assert_eq!(stmt.from.as_ref().map(|t| t.qualifier()), Some("e"));
                assert_eq!(stmt.joins[0].join_type, JoinType::Left);
                assert_eq!(stmt.group_by.len(), 2);
                assert!(!stmt.order_by[0].asc);
                assert_eq!(stmt.limit, Some(10));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_parse_view_and_drop() {
        let view = "CREATE OR REPLACE VIEW employee_details SQL SECURITY INVOKER AS SELECT e.emp_id FROM employees e";
        match parse_sql(view).unwrap() {
            SqlStatement::CreateView(stmt) => {
                assert!(stmt.or_replace);
                assert_eq!(stmt.security, Some(SqlSecurity::Invoker));
            }
            other => panic!("unexpected statement {:?}", other),
        }

        match parse_sql("DROP INDEX IF EXISTS idx_emp_name;").unwrap() {
            SqlStatement::Drop(stmt) => {
                assert_eq!(stmt.kind, ObjectKind::Index);
                assert!(stmt.if_exists);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors() {
        let inline_pk = parse_err("CREATE TABLE t (id INT64 PRIMARY KEY, name STRING(10))");
        assert!(inline_pk.starts_with("Expected ')' or ',' but got keyword PRIMARY"));

        let bare_default =
            parse_err("CREATE TABLE t (ts TIMESTAMP DEFAULT CURRENT_TIMESTAMP) PRIMARY KEY (ts)");
        assert!(bare_default.starts_with("Expected '(' but got keyword CURRENT_TIMESTAMP"));

        let returning = parse_err("INSERT INTO t (a) VALUES (1) RETURNING a");
        assert!(returning.starts_with("Expected end of input but got keyword RETURNING"));

        let no_columns = parse_err("INSERT INTO t VALUES (1)");
        assert!(no_columns.starts_with("Expected '(' but got keyword VALUES"));

        let no_pk = parse_err("CREATE TABLE t (a INT64)");
        assert!(no_pk.starts_with("Expected keyword PRIMARY but got end of input"));
    }

    #[test]
    fn test_unknown_types_are_kept() {
        match parse_sql("CREATE TABLE t (a VARCHAR(255), b SERIAL) PRIMARY KEY (a)").unwrap() {
            SqlStatement::CreateTable(stmt) => {
                assert_eq!(stmt.columns[0].data_type, DataType::Other("VARCHAR".into()));
                assert_eq!(stmt.columns[1].data_type, DataType::Other("SERIAL".into()));
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }
}
