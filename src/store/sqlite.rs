//! SQLite-backed `RespondentStore` implementation with durable persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{RespondentStore, StoreError, StoreResult};
use crate::respondent::{NewRespondent, Respondent, RespondentFilter};

const RESPONDENT_COLUMNS: &str = "id, author_id, author_name, match, escape_content, content";

/// Persistent SQLite store. Each call opens its own connection.
#[derive(Debug)]
pub struct SqliteRespondentStore {
    db_path: PathBuf,
}

impl SqliteRespondentStore {
    /// Opens the database at `path`, creating parent directories and schema if needed.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { db_path };
        let connection = store.open_connection()?;
        store.initialize_schema(&connection)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open_connection(&self) -> StoreResult<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;
        Ok(connection)
    }

    fn initialize_schema(&self, connection: &Connection) -> StoreResult<()> {
        // AUTOINCREMENT keeps deleted ids from being handed out again.
        connection.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS dyn_respondent (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL,
                author_name TEXT NOT NULL,
                match TEXT NOT NULL,
                escape_content INTEGER NOT NULL,
                content TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_dyn_respondent_match ON dyn_respondent (match);
            "#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl RespondentStore for SqliteRespondentStore {
    async fn create(&self, record: NewRespondent) -> StoreResult<Respondent> {
        let connection = self.open_connection()?;
        connection.execute(
            r#"
            INSERT INTO dyn_respondent (author_id, author_name, match, escape_content, content)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                id_to_db("author_id", record.author_id)?,
                record.author_name,
                record.trigger,
                record.escape,
                record.content,
            ],
        )?;
        let id = id_from_db("id", connection.last_insert_rowid())?;
        Ok(record.with_id(id))
    }

    async fn get(&self, id: u64) -> StoreResult<Option<Respondent>> {
        let connection = self.open_connection()?;
        let raw = connection
            .query_row(
                &format!("SELECT {RESPONDENT_COLUMNS} FROM dyn_respondent WHERE id = ?1"),
                params![id_to_db("id", id)?],
                RawRespondent::from_row,
            )
            .optional()?;
        raw.map(RawRespondent::into_respondent).transpose()
    }

    async fn query(&self, filter: &RespondentFilter) -> StoreResult<Vec<Respondent>> {
        let connection = self.open_connection()?;
        let (clause, values) = where_clause(filter)?;
        let mut statement = connection.prepare(&format!(
            "SELECT {RESPONDENT_COLUMNS} FROM dyn_respondent{clause} ORDER BY id"
        ))?;
        let rows = statement.query_map(params_from_iter(values), RawRespondent::from_row)?;
        rows.map(|row| row?.into_respondent()).collect()
    }

    async fn query_ids(&self, filter: &RespondentFilter) -> StoreResult<Vec<u64>> {
        let connection = self.open_connection()?;
        let (clause, values) = where_clause(filter)?;
        let mut statement =
            connection.prepare(&format!("SELECT id FROM dyn_respondent{clause} ORDER BY id"))?;
        let rows = statement.query_map(params_from_iter(values), |row| row.get::<_, i64>(0))?;
        rows.map(|row| id_from_db("id", row?)).collect()
    }

    async fn triggers(&self) -> StoreResult<Vec<String>> {
        let connection = self.open_connection()?;
        let mut statement = connection.prepare("SELECT DISTINCT match FROM dyn_respondent")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let connection = self.open_connection()?;
        let removed = connection.execute(
            "DELETE FROM dyn_respondent WHERE id = ?1",
            params![id_to_db("id", id)?],
        )?;
        Ok(removed > 0)
    }
}

/// Row as read from SQLite, before integer columns are range-checked.
struct RawRespondent {
    id: i64,
    author_id: i64,
    author_name: String,
    trigger: String,
    escape: bool,
    content: String,
}

impl RawRespondent {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            author_id: row.get(1)?,
            author_name: row.get(2)?,
            trigger: row.get(3)?,
            escape: row.get(4)?,
            content: row.get(5)?,
        })
    }

    fn into_respondent(self) -> StoreResult<Respondent> {
        Ok(Respondent {
            id: id_from_db("id", self.id)?,
            author_id: id_from_db("author_id", self.author_id)?,
            author_name: self.author_name,
            trigger: self.trigger,
            escape: self.escape,
            content: self.content,
        })
    }
}

fn where_clause(filter: &RespondentFilter) -> StoreResult<(String, Vec<rusqlite::types::Value>)> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(trigger) = &filter.trigger {
        values.push(rusqlite::types::Value::Text(trigger.clone()));
        conditions.push(format!("match = ?{}", values.len()));
    }
    if let Some(author_id) = filter.author_id {
        values.push(rusqlite::types::Value::Integer(id_to_db(
            "author_id",
            author_id,
        )?));
        conditions.push(format!("author_id = ?{}", values.len()));
    }
    if conditions.is_empty() {
        return Ok((String::new(), values));
    }
    Ok((format!(" WHERE {}", conditions.join(" AND ")), values))
}

fn id_to_db(field: &'static str, value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidPersistedValue {
        field,
        value: value.to_string(),
    })
}

fn id_from_db(field: &'static str, value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidPersistedValue {
        field,
        value: value.to_string(),
    })
}
