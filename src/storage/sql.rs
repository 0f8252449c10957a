// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL setting store.
//!
//! One row per candidate record. The name and value columns come from
//! [`SettingTableConfig`]; every declared dimension is a column of its own:
//!
//! ```sql
//! CREATE TABLE Setting (
//!   Name        VARBINARY(255) NOT NULL,
//!   Value       TEXT NOT NULL,
//!   Environment VARBINARY(255) NOT NULL,   -- one column per dimension
//!   Version     VARBINARY(255) NOT NULL,
//!   UNIQUE KEY uq_Setting_address (Name, Environment, Version)
//! )
//! ```
//!
//! Key columns compare bytewise on both backends, so `ABC` and `abc` (or
//! `ABC` and `ABC `) are different addresses. The unique key over the whole
//! address turns a lost race between two writers into a duplicate-key error
//! instead of a second row.
//!
//! Reads fetch every row of a setting name; dimension filtering is left to
//! the resolution pipeline. Writes run in one transaction per call and
//! delete the exact row before inserting it again, so a failed batch leaves
//! the table untouched.
//!
//! ## sqlx Any Driver Quirks
//!
//! MySQL `TEXT` columns come back as BLOBs through the `Any` driver, so text
//! columns are read as `String` first and as UTF-8 bytes second.

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, info};

use crate::candidate::{CandidateRecord, DimensionAssignment};
use crate::config::SettingTableConfig;
use crate::resilience::retry::{retry, retry_if, RetryConfig};
use super::traits::{SettingStore, StorageError};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// Errors worth another attempt: lost connections, an exhausted pool, and a
/// duplicate key left by a concurrent writer of the same address.
fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Reject anything that could not be spliced into SQL as a bare identifier.
fn check_identifier(name: &str) -> Result<(), StorageError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier(name.to_string()))
    }
}

fn text_column(row: &AnyRow, column: &str) -> Result<String, StorageError> {
    row.try_get::<String, _>(column).or_else(|_| {
        let bytes: Vec<u8> = row.try_get(column).map_err(backend)?;
        String::from_utf8(bytes).map_err(|e| StorageError::Backend(format!("column {}: {}", column, e)))
    })
}

/// Statements built once per store from the table layout.
#[derive(Debug, Clone)]
struct Statements {
    create_table: String,
    create_index: Option<String>,
    select: String,
    delete: String,
    insert: String,
}

impl Statements {
    fn build(table: &SettingTableConfig, dimensions: &[String], is_sqlite: bool) -> Self {
        // SQLite compares TEXT bytewise; MySQL VARCHAR collations fold case
        // and trailing spaces, so key columns are binary there.
        let key_type = if is_sqlite { "TEXT" } else { "VARBINARY(255)" };
        let t = &table.table;
        let name = &table.name_column;
        let value = &table.value_column;

        let mut columns = vec![
            format!("`{}` {} NOT NULL", name, key_type),
            format!("`{}` TEXT NOT NULL", value),
        ];
        columns.extend(dimensions.iter().map(|d| format!("`{}` {} NOT NULL", d, key_type)));

        let mut key = vec![format!("`{}`", name)];
        key.extend(dimensions.iter().map(|d| format!("`{}`", d)));
        let key = key.join(", ");

        let (create_table, create_index) = if is_sqlite {
            (
                format!("CREATE TABLE IF NOT EXISTS `{}` ({})", t, columns.join(", ")),
                Some(format!("CREATE UNIQUE INDEX IF NOT EXISTS `uq_{}_address` ON `{}` ({})", t, t, key)),
            )
        } else {
            columns.push(format!("UNIQUE KEY `uq_{}_address` ({})", t, key));
            (format!("CREATE TABLE IF NOT EXISTS `{}` ({})", t, columns.join(", ")), None)
        };

        let mut selected = vec![format!("`{}`", name), format!("`{}`", value)];
        selected.extend(dimensions.iter().map(|d| format!("`{}`", d)));
        let select = format!("SELECT {} FROM `{}` WHERE `{}` = ?", selected.join(", "), t, name);

        let mut conditions = vec![format!("`{}` = ?", name)];
        conditions.extend(dimensions.iter().map(|d| format!("`{}` = ?", d)));
        let delete = format!("DELETE FROM `{}` WHERE {}", t, conditions.join(" AND "));

        let mut inserted = vec![format!("`{}`", name)];
        inserted.extend(dimensions.iter().map(|d| format!("`{}`", d)));
        inserted.push(format!("`{}`", value));
        let placeholders = vec!["?"; inserted.len()].join(", ");
        let insert = format!("INSERT INTO `{}` ({}) VALUES ({})", t, inserted.join(", "), placeholders);

        Self {
            create_table,
            create_index,
            select,
            delete,
            insert,
        }
    }
}

pub struct SqlStore {
    pool: AnyPool,
    table: SettingTableConfig,
    dimensions: Vec<String>,
    statements: Statements,
}

impl SqlStore {
    /// Connect, then create the table if it does not exist yet.
    ///
    /// `dimensions` are the column names of the declared dimensions; their
    /// order does not matter.
    pub async fn new(
        connection_string: &str,
        table: SettingTableConfig,
        dimensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, StorageError> {
        install_drivers();

        let mut dimensions: Vec<String> = dimensions.into_iter().map(Into::into).collect();
        dimensions.sort();
        dimensions.dedup();

        check_identifier(&table.table)?;
        check_identifier(&table.name_column)?;
        check_identifier(&table.value_column)?;
        for d in &dimensions {
            check_identifier(d)?;
            if *d == table.name_column || *d == table.value_column {
                return Err(StorageError::Constraint(format!(
                    "dimension column '{}' collides with the name or value column",
                    d
                )));
            }
        }

        let is_sqlite = connection_string.starts_with("sqlite:");

        let pool = retry("sql_connect", &RetryConfig::connect(), || async {
            AnyPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .idle_timeout(Duration::from_secs(300))
                .connect(connection_string)
                .await
                .map_err(backend)
        })
        .await?;

        let statements = Statements::build(&table, &dimensions, is_sqlite);
        let store = Self {
            pool,
            table,
            dimensions,
            statements,
        };
        store.init_schema().await?;

        info!(table = %store.table.table, dimensions = ?store.dimensions, "SQL setting store ready");
        Ok(store)
    }

    /// Get a clone of the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    /// Dimension columns, sorted.
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        retry("sql_init_schema", &RetryConfig::connect(), || async {
            sqlx::query(&self.statements.create_table)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
            if let Some(ref create_index) = self.statements.create_index {
                sqlx::query(create_index)
                    .execute(&self.pool)
                    .await
                    .map_err(backend)?;
            }
            Ok(())
        })
        .await
    }

    /// Dimension values of `assignment` in column order.
    fn key_values<'a>(&self, assignment: &'a DimensionAssignment) -> Result<Vec<&'a str>, StorageError> {
        if assignment.setting_name.is_empty() {
            return Err(StorageError::Constraint("setting name must not be empty".into()));
        }
        if assignment.dimensions.len() != self.dimensions.len() {
            return Err(StorageError::Constraint(format!(
                "'{}' must address columns [{}]",
                assignment.setting_name,
                self.dimensions.join(", ")
            )));
        }
        self.dimensions
            .iter()
            .map(|d| {
                assignment.dimensions.get(d).map(String::as_str).ok_or_else(|| {
                    StorageError::Constraint(format!("'{}' has no value for column '{}'", assignment.setting_name, d))
                })
            })
            .collect()
    }

    fn read_record(&self, row: &AnyRow) -> Result<CandidateRecord, StorageError> {
        let mut record = CandidateRecord::new(
            text_column(row, &self.table.name_column)?,
            text_column(row, &self.table.value_column)?,
        );
        for d in &self.dimensions {
            record.dimensions.insert(d.clone(), text_column(row, d)?);
        }
        Ok(record)
    }
}

#[async_trait]
impl SettingStore for SqlStore {
    async fn select(&self, setting_name: &str) -> Result<Vec<CandidateRecord>, StorageError> {
        let rows = retry_if("sql_select", &RetryConfig::query(), is_transient, || async {
            sqlx::query(&self.statements.select)
                .bind(setting_name)
                .fetch_all(&self.pool)
                .await
        })
        .await
        .map_err(backend)?;

        let records = rows
            .iter()
            .map(|row| self.read_record(row))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(setting = %setting_name, rows = records.len(), "Fetched candidate rows");
        Ok(records)
    }

    async fn update(&self, assignment: &DimensionAssignment, value: &str) -> Result<usize, StorageError> {
        self.save_many(&[(assignment.clone(), value.to_string())]).await
    }

    /// Every row is deleted at its exact address and inserted again, all in
    /// one transaction. Returns the number of rows written.
    async fn save_many(&self, rows: &[(DimensionAssignment, String)]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let prepared = rows
            .iter()
            .map(|(assignment, value)| {
                self.key_values(assignment)
                    .map(|keys| (assignment.setting_name.as_str(), keys, value.as_str()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        retry_if("sql_save_many", &RetryConfig::write(), is_transient, || async {
            // Dropping the transaction on an early return rolls it back.
            let mut tx = self.pool.begin().await?;

            for (name, keys, value) in &prepared {
                let mut delete = sqlx::query(&self.statements.delete).bind(*name);
                for key in keys {
                    delete = delete.bind(*key);
                }
                delete.execute(&mut *tx).await?;

                let mut insert = sqlx::query(&self.statements.insert).bind(*name);
                for key in keys {
                    insert = insert.bind(*key);
                }
                insert.bind(*value).execute(&mut *tx).await?;
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(prepared.len())
        })
        .await
        .map_err(backend)
    }

    fn kind(&self) -> &'static str {
        "sql"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(dir: &TempDir, dimensions: &[&str]) -> SqlStore {
        let path = dir.path().join("settings.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        SqlStore::new(&url, SettingTableConfig::default(), dimensions.iter().copied())
            .await
            .unwrap()
    }

    fn assignment(name: &str, env: &str, version: &str) -> DimensionAssignment {
        DimensionAssignment::new(name)
            .with_dimension("Environment", env)
            .with_dimension("Version", version)
    }

    #[test]
    fn test_identifier_validation() {
        assert!(check_identifier("Environment").is_ok());
        assert!(check_identifier("_v2").is_ok());
        assert!(check_identifier("2nd").is_err());
        assert!(check_identifier("Name; DROP TABLE x").is_err());
        assert!(check_identifier("").is_err());
    }

    #[test]
    fn test_statements_follow_layout() {
        let dims = vec!["Environment".to_string(), "Version".to_string()];
        let sql = Statements::build(&SettingTableConfig::default(), &dims, true);
        assert_eq!(
            sql.select,
            "SELECT `Name`, `Value`, `Environment`, `Version` FROM `Setting` WHERE `Name` = ?"
        );
        assert_eq!(
            sql.delete,
            "DELETE FROM `Setting` WHERE `Name` = ? AND `Environment` = ? AND `Version` = ?"
        );
        assert_eq!(
            sql.insert,
            "INSERT INTO `Setting` (`Name`, `Environment`, `Version`, `Value`) VALUES (?, ?, ?, ?)"
        );
        assert_eq!(
            sql.create_index.as_deref(),
            Some("CREATE UNIQUE INDEX IF NOT EXISTS `uq_Setting_address` ON `Setting` (`Name`, `Environment`, `Version`)")
        );

        let mysql = Statements::build(&SettingTableConfig::default(), &dims, false);
        assert!(mysql.create_table.contains("`Environment` VARBINARY(255) NOT NULL"));
        assert!(!mysql.create_table.contains("VARCHAR"));
        assert!(mysql
            .create_table
            .contains("UNIQUE KEY `uq_Setting_address` (`Name`, `Environment`, `Version`)"));
        assert!(mysql.create_index.is_none());
    }

    #[test]
    fn test_only_transient_errors_are_retried() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset"
        ))));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::PoolClosed));
    }

    #[tokio::test]
    async fn test_rejects_invalid_table_name() {
        let table = SettingTableConfig {
            table: "bad table".into(),
            ..Default::default()
        };
        let result = SqlStore::new("sqlite::memory:", table, ["Environment"]).await;
        assert!(matches!(result, Err(StorageError::InvalidIdentifier(_))));
    }

    #[tokio::test]
    async fn test_select_returns_every_row_for_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir, &["Environment", "Version"]).await;

        store.update(&assignment("Foo", "*", "*"), "v0").await.unwrap();
        store.update(&assignment("Foo", "ABC", "1.3.0"), "v1").await.unwrap();
        store.update(&assignment("Bar", "ABC", "1.3.0"), "bar").await.unwrap();

        let rows = store.select("Foo").await.unwrap();
        assert_eq!(rows.len(), 2);
        let v1 = rows.iter().find(|r| r.value == "v1").unwrap();
        assert_eq!(v1.dimension("Environment"), Some("ABC"));
        assert_eq!(v1.dimension("Version"), Some("1.3.0"));
    }

    #[tokio::test]
    async fn test_update_overwrites_exact_row_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir, &["Environment", "Version"]).await;

        store.update(&assignment("Foo", "*", "*"), "wild").await.unwrap();
        store.update(&assignment("Foo", "ABC", "*"), "first").await.unwrap();
        store.update(&assignment("Foo", "ABC", "*"), "second").await.unwrap();

        let rows = store.select("Foo").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.value == "wild"));
        assert!(rows.iter().any(|r| r.value == "second"));
        assert!(store.exists(&assignment("Foo", "ABC", "*")).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_many_rejects_partial_assignment_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir, &["Environment", "Version"]).await;

        let batch = vec![
            (assignment("Foo", "ABC", "1.0.0"), "ok".to_string()),
            (DimensionAssignment::new("Bar").with_dimension("Environment", "ABC"), "bad".to_string()),
        ];
        let err = store.save_many(&batch).await.unwrap_err();
        assert!(matches!(err, StorageError::Constraint(_)));
        assert!(store.select("Foo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_many_writes_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir, &["Environment"]).await;

        let batch: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|name| {
                (
                    DimensionAssignment::new(*name).with_dimension("Environment", "*"),
                    format!("value-{}", name),
                )
            })
            .collect();

        assert_eq!(store.save_many(&batch).await.unwrap(), 3);
        assert_eq!(store.save_many(&batch).await.unwrap(), 3);
        assert_eq!(store.select("B").await.unwrap().len(), 1);
        assert_eq!(store.save_many(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open(&dir, &["Environment"]).await;
            store
                .update(&DimensionAssignment::new("Foo").with_dimension("Environment", "XYZ"), "kept")
                .await
                .unwrap();
            store.pool().close().await;
        }

        let store = open(&dir, &["Environment"]).await;
        let rows = store.select("Foo").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "kept");
    }

    #[tokio::test]
    async fn test_addresses_differing_in_case_or_spacing_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir, &["Environment"]).await;
        let at = |env: &str| DimensionAssignment::new("Foo").with_dimension("Environment", env);

        store.update(&at("abc"), "lower").await.unwrap();
        store.update(&at("ABC"), "upper").await.unwrap();
        store.update(&at("ABC "), "padded").await.unwrap();

        let rows = store.select("Foo").await.unwrap();
        assert_eq!(rows.len(), 3);
        let lower = rows.iter().find(|r| r.dimension("Environment") == Some("abc")).unwrap();
        assert_eq!(lower.value, "lower");
        assert!(store.select("foo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_address_is_unique_in_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir, &["Environment"]).await;
        store
            .update(&DimensionAssignment::new("Foo").with_dimension("Environment", "ABC"), "one")
            .await
            .unwrap();

        let duplicate = sqlx::query(&store.statements.insert)
            .bind("Foo")
            .bind("ABC")
            .bind("two")
            .execute(&store.pool)
            .await
            .unwrap_err();
        assert!(is_transient(&duplicate));
        assert_eq!(store.select("Foo").await.unwrap().len(), 1);
    }
}
