//! In-process stand-in for a PostgreSQL server.
//!
//! Understands exactly the catalog queries issued by the inspector and the
//! DDL produced by `statements`, keeps transactional state per session, and
//! records every connect and statement so tests can assert on them.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::SqlError;
use crate::inspect::{DATABASE_OWNER_SQL, ROLE_EXISTS_SQL, SCHEMA_OWNER_SQL};
use crate::results::ResultSet;
use crate::transport::{Connector, Session};
use crate::types::RowValues;

/// Owner of `public` in a freshly created database (PostgreSQL 15+).
pub const DEFAULT_SCHEMA_OWNER: &str = "pg_database_owner";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FakeRole {
    pub login: bool,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeDatabase {
    pub owner: String,
    pub schema_owner: String,
    pub grants: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Execute,
}

/// One statement as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub dbname: String,
    pub sql: String,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, Default)]
struct ServerState {
    roles: BTreeMap<String, FakeRole>,
    databases: BTreeMap<String, FakeDatabase>,
}

#[derive(Debug, Default)]
struct Inner {
    state: ServerState,
    log: Vec<Recorded>,
    connects: Vec<String>,
    refuse_remaining: u32,
    refused_dbs: HashSet<String>,
    failing_statements: Vec<String>,
    failing_names: HashSet<String>,
}

/// Shared handle to the fake server; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    inner: Arc<Mutex<Inner>>,
}

impl FakeServer {
    /// An empty cluster holding only the `postgres` role and database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
            .with_role("postgres", "postgres")
            .with_database("postgres", "postgres")
    }

    #[must_use]
    pub fn with_role(self, name: &str, password: &str) -> Self {
        self.lock().state.roles.insert(
            name.to_string(),
            FakeRole {
                login: true,
                password: Some(password.to_string()),
            },
        );
        self
    }

    #[must_use]
    pub fn with_database(self, name: &str, owner: &str) -> Self {
        self.lock().state.databases.insert(
            name.to_string(),
            FakeDatabase {
                owner: owner.to_string(),
                schema_owner: DEFAULT_SCHEMA_OWNER.to_string(),
                grants: BTreeSet::new(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_schema_owner(self, db: &str, owner: &str) -> Self {
        if let Some(database) = self.lock().state.databases.get_mut(db) {
            database.schema_owner = owner.to_string();
        }
        self
    }

    /// Refuse the next `count` connection attempts. `u32::MAX` refuses forever.
    pub fn refuse_connections(&self, count: u32) {
        self.lock().refuse_remaining = count;
    }

    /// Refuse every connection to one database.
    pub fn refuse_connections_to(&self, db: &str) {
        self.lock().refused_dbs.insert(db.to_string());
    }

    /// Fail every executed statement containing `fragment`.
    pub fn fail_statement(&self, fragment: &str) {
        self.lock().failing_statements.push(fragment.to_string());
    }

    /// Fail every catalog query whose parameters mention `name`.
    pub fn fail_queries_for(&self, name: &str) {
        self.lock().failing_names.insert(name.to_string());
    }

    /// Drop every injected failure; recorded history is kept.
    pub fn clear_faults(&self) {
        let mut inner = self.lock();
        inner.refuse_remaining = 0;
        inner.refused_dbs.clear();
        inner.failing_statements.clear();
        inner.failing_names.clear();
    }

    /// A session on `dbname` that bypasses connect bookkeeping.
    #[must_use]
    pub fn session(&self, dbname: &str) -> Box<dyn Session> {
        Box::new(FakeSession::new(self.clone(), dbname))
    }

    /// Connection attempts, successful or not.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.lock().connects.len()
    }

    #[must_use]
    pub fn connects_to(&self, db: &str) -> usize {
        self.lock().connects.iter().filter(|c| *c == db).count()
    }

    #[must_use]
    pub fn recorded(&self) -> Vec<Recorded> {
        self.lock().log.clone()
    }

    /// Executed statements, excluding transaction control.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.lock()
            .log
            .iter()
            .filter(|r| r.kind == StatementKind::Execute && !is_tx_control(&r.sql))
            .map(|r| r.sql.clone())
            .collect()
    }

    /// Number of statements that could have changed server state.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.executed().len()
    }

    #[must_use]
    pub fn role(&self, name: &str) -> Option<FakeRole> {
        self.lock().state.roles.get(name).cloned()
    }

    #[must_use]
    pub fn database(&self, name: &str) -> Option<FakeDatabase> {
        self.lock().state.databases.get(name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Connector for FakeServer {
    async fn connect(&self, dbname: &str) -> Result<Box<dyn Session>, SqlError> {
        {
            let mut inner = self.lock();
            inner.connects.push(dbname.to_string());
            if inner.refuse_remaining > 0 {
                if inner.refuse_remaining != u32::MAX {
                    inner.refuse_remaining -= 1;
                }
                return Err(SqlError::ConnectionError("connection refused".into()));
            }
            if inner.refused_dbs.contains(dbname) {
                return Err(SqlError::ConnectionError(format!(
                    "connection to {dbname} refused"
                )));
            }
            if !inner.state.databases.contains_key(dbname) {
                return Err(SqlError::ConnectionError(format!(
                    "database \"{dbname}\" does not exist"
                )));
            }
        }
        Ok(self.session(dbname))
    }
}

struct FakeSession {
    server: FakeServer,
    dbname: String,
    tx: Option<ServerState>,
    aborted: bool,
}

impl FakeSession {
    fn new(server: FakeServer, dbname: &str) -> Self {
        Self {
            server,
            dbname: dbname.to_string(),
            tx: None,
            aborted: false,
        }
    }

    fn record(&self, inner: &mut Inner, sql: &str, kind: StatementKind) {
        inner.log.push(Recorded {
            dbname: self.dbname.clone(),
            sql: sql.to_string(),
            kind,
        });
    }

    fn run(&mut self, sql: &str) -> Result<(), SqlError> {
        let server = self.server.clone();
        let mut inner = server.lock();
        self.record(&mut inner, sql, StatementKind::Execute);

        match sql {
            "BEGIN" => {
                self.tx = Some(inner.state.clone());
                self.aborted = false;
                return Ok(());
            }
            "COMMIT" => {
                if let Some(state) = self.tx.take() {
                    if !self.aborted {
                        inner.state = state;
                    }
                }
                self.aborted = false;
                return Ok(());
            }
            "ROLLBACK" => {
                self.tx = None;
                self.aborted = false;
                return Ok(());
            }
            _ => {}
        }

        if self.aborted {
            return Err(SqlError::ExecutionError(
                "current transaction is aborted, commands ignored until end of transaction block"
                    .into(),
            ));
        }

        let outcome = if inner.failing_statements.iter().any(|f| sql.contains(f)) {
            Err(format!("injected failure: {sql}"))
        } else {
            let in_tx = self.tx.is_some();
            let state = match self.tx.as_mut() {
                Some(state) => state,
                None => &mut inner.state,
            };
            apply(state, &self.dbname, sql, in_tx)
        };

        outcome.map_err(|msg| {
            if self.tx.is_some() {
                self.aborted = true;
            }
            SqlError::ExecutionError(msg)
        })
    }

    fn answer(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlError> {
        let server = self.server.clone();
        let mut inner = server.lock();
        self.record(&mut inner, sql, StatementKind::Query);

        let name = params.first().and_then(RowValues::as_text).unwrap_or_default();
        if inner.failing_names.contains(name) {
            return Err(SqlError::ExecutionError(format!(
                "injected catalog failure for {name}"
            )));
        }
        let state = self.tx.as_ref().unwrap_or(&inner.state);

        let owner_row = |owner: Option<&String>| {
            let rows = owner
                .map(|o| vec![vec![RowValues::Text(o.clone())]])
                .unwrap_or_default();
            ResultSet::from_rows(vec!["owner".into()], rows)
        };

        match sql {
            "SELECT 1" => Ok(ResultSet::from_rows(
                vec!["?column?".into()],
                vec![vec![RowValues::Int(1)]],
            )),
            ROLE_EXISTS_SQL => {
                let rows = if state.roles.contains_key(name) {
                    vec![vec![RowValues::Int(1)]]
                } else {
                    Vec::new()
                };
                Ok(ResultSet::from_rows(vec!["present".into()], rows))
            }
            DATABASE_OWNER_SQL => Ok(owner_row(state.databases.get(name).map(|d| &d.owner))),
            SCHEMA_OWNER_SQL => Ok(owner_row(
                state.databases.get(&self.dbname).map(|d| &d.schema_owner),
            )),
            other => Err(SqlError::ExecutionError(format!(
                "fake server does not understand query: {other}"
            ))),
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn execute_batch(&mut self, sql: &str) -> Result<(), SqlError> {
        self.run(sql.trim())
    }

    async fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, SqlError> {
        self.answer(sql, params)
    }
}

fn is_tx_control(sql: &str) -> bool {
    matches!(sql, "BEGIN" | "COMMIT" | "ROLLBACK")
}

fn apply(state: &mut ServerState, dbname: &str, sql: &str, in_tx: bool) -> Result<(), String> {
    if let Some(rest) = sql.strip_prefix("CREATE ROLE ") {
        let role = first_ident(rest, sql)?;
        if state.roles.contains_key(&role) {
            return Err(format!("role \"{role}\" already exists"));
        }
        state.roles.insert(
            role,
            FakeRole {
                login: rest.contains("LOGIN"),
                password: None,
            },
        );
        return Ok(());
    }

    if let Some(rest) = sql.strip_prefix("ALTER ROLE ") {
        let (head, literal) = rest
            .split_once(" PASSWORD ")
            .ok_or_else(|| format!("syntax error in {sql}"))?;
        let role = first_ident(head, sql)?;
        let entry = state
            .roles
            .get_mut(&role)
            .ok_or_else(|| format!("role \"{role}\" does not exist"))?;
        entry.login = entry.login || head.contains("LOGIN");
        entry.password = Some(unquote_literal(literal));
        return Ok(());
    }

    if let Some(rest) = sql.strip_prefix("CREATE DATABASE ") {
        if in_tx {
            return Err("CREATE DATABASE cannot run inside a transaction block".into());
        }
        let idents = quoted_idents(rest);
        let (Some(db), Some(owner)) = (idents.first(), idents.get(1)) else {
            return Err(format!("syntax error in {sql}"));
        };
        if state.databases.contains_key(db) {
            return Err(format!("database \"{db}\" already exists"));
        }
        if !state.roles.contains_key(owner) {
            return Err(format!("role \"{owner}\" does not exist"));
        }
        state.databases.insert(
            db.clone(),
            FakeDatabase {
                owner: owner.clone(),
                schema_owner: DEFAULT_SCHEMA_OWNER.to_string(),
                grants: BTreeSet::new(),
            },
        );
        return Ok(());
    }

    if let Some(rest) = sql.strip_prefix("ALTER DATABASE ") {
        let idents = quoted_idents(rest);
        let (Some(db), Some(owner)) = (idents.first(), idents.get(1)) else {
            return Err(format!("syntax error in {sql}"));
        };
        if !state.roles.contains_key(owner) {
            return Err(format!("role \"{owner}\" does not exist"));
        }
        let database = state
            .databases
            .get_mut(db)
            .ok_or_else(|| format!("database \"{db}\" does not exist"))?;
        database.owner = owner.clone();
        return Ok(());
    }

    if let Some(rest) = sql.strip_prefix("ALTER SCHEMA public OWNER TO ") {
        let owner = first_ident(rest, sql)?;
        if !state.roles.contains_key(&owner) {
            return Err(format!("role \"{owner}\" does not exist"));
        }
        let database = state
            .databases
            .get_mut(dbname)
            .ok_or_else(|| format!("database \"{dbname}\" does not exist"))?;
        database.schema_owner = owner;
        return Ok(());
    }

    if let Some(rest) = sql.strip_prefix("GRANT ALL PRIVILEGES ON ") {
        let (object, grantee) = rest
            .split_once(" TO ")
            .ok_or_else(|| format!("syntax error in {sql}"))?;
        let grantee = first_ident(grantee, sql)?;
        if !state.roles.contains_key(&grantee) {
            return Err(format!("role \"{grantee}\" does not exist"));
        }
        let database = state
            .databases
            .get_mut(dbname)
            .ok_or_else(|| format!("database \"{dbname}\" does not exist"))?;
        database.grants.insert(format!("{object} -> {grantee}"));
        return Ok(());
    }

    Err(format!("fake server does not understand statement: {sql}"))
}

fn first_ident(fragment: &str, sql: &str) -> Result<String, String> {
    quoted_idents(fragment)
        .into_iter()
        .next()
        .ok_or_else(|| format!("syntax error in {sql}"))
}

/// Double-quoted identifiers in order, with `""` unescaped.
fn quoted_idents(fragment: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = fragment.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }
        let mut ident = String::new();
        while let Some(c) = chars.next() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    ident.push('"');
                } else {
                    break;
                }
            } else {
                ident.push(c);
            }
        }
        out.push(ident);
    }
    out
}

fn unquote_literal(literal: &str) -> String {
    let literal = literal.trim();
    let (escaped, body) = match literal.strip_prefix('E') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let body = body
        .strip_prefix('\'')
        .and_then(|b| b.strip_suffix('\''))
        .unwrap_or(body)
        .replace("''", "'");
    if escaped {
        body.replace("\\\\", "\\")
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_identifiers() {
        assert_eq!(
            quoted_idents(r#""a" OWNER "b""c""#),
            vec!["a".to_string(), "b\"c".to_string()]
        );
    }

    #[test]
    fn unquotes_password_literals() {
        assert_eq!(unquote_literal("'it''s'"), "it's");
        assert_eq!(unquote_literal(r"E'a\\b'"), r"a\b");
    }

    #[tokio::test]
    async fn create_database_is_rejected_inside_a_transaction() {
        let server = FakeServer::new().with_role("app", "pw");
        let mut session = server.session("postgres");
        session.begin().await.unwrap();
        let err = session
            .execute_batch(r#"CREATE DATABASE "app" OWNER "app""#)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("transaction block"));
        session.rollback().await.unwrap();
        assert!(server.database("app").is_none());
    }

    #[tokio::test]
    async fn rollback_discards_transactional_changes() {
        let server = FakeServer::new();
        let mut session = server.session("postgres");
        session.begin().await.unwrap();
        session
            .execute_batch(r#"CREATE ROLE "app" LOGIN"#)
            .await
            .unwrap();
        session.rollback().await.unwrap();
        assert!(server.role("app").is_none());
    }
}
