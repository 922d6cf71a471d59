//! Parcel store contract and SQLite implementation.
//!
//! # Responsibility
//! - Translate parcel operations into single parameterized statements on
//!   the `parcel` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `add` calls `Parcel::validate()` before the insert.
//! - Read paths reject invalid persisted state instead of masking it.
//! - `set_address` and `delete` only touch rows whose persisted status is
//!   `registered`; a miss is reported as a `WriteOutcome`, never an error.
//! - `advance_status` is a compare-and-set on the persisted status.
//! - The store borrows its connection and never closes it.

use crate::db::DbError;
use crate::model::parcel::{
    ClientId, Parcel, ParcelNumber, ParcelStatus, ParcelValidationError,
};
use log::{debug, info};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: [&str; 5] = ["number", "client", "status", "address", "created_at"];

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from parcel persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Parcel failed record-level validation before the write.
    Validation(ParcelValidationError),
    /// Underlying SQLite failure.
    Db(DbError),
    /// No parcel with this number exists.
    NotFound(ParcelNumber),
    /// Persisted row cannot be converted into a valid `Parcel`.
    InvalidData(String),
    /// Connection lacks the `parcel` table.
    MissingRequiredTable(&'static str),
    /// `parcel` table lacks an expected column.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(number) => write!(f, "parcel not found: {number}"),
            Self::InvalidData(message) => write!(f, "invalid persisted parcel data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "parcel store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "parcel store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ParcelValidationError> for RepoError {
    fn from(value: ParcelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of a mutating call that matched zero or more rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The row was changed.
    Applied,
    /// The row exists but its status forbids this change.
    PreconditionFailed,
    /// No row with the given number exists.
    NotFound,
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::PreconditionFailed => "precondition_failed",
            Self::NotFound => "not_found",
        }
    }
}

/// Repository interface for parcel operations.
pub trait ParcelStore {
    /// Inserts a parcel and returns its storage-assigned number.
    ///
    /// `parcel.number` is ignored.
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber>;
    /// Loads one parcel; `NotFound` when no row matches.
    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Loads every parcel of `client`, ordered by number.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
    /// Overwrites the status regardless of the current one.
    fn set_status(&self, number: ParcelNumber, status: &ParcelStatus)
        -> RepoResult<WriteOutcome>;
    /// Moves the status from `from` to `to` only if it still equals `from`.
    fn advance_status(
        &self,
        number: ParcelNumber,
        from: &ParcelStatus,
        to: &ParcelStatus,
    ) -> RepoResult<WriteOutcome>;
    /// Overwrites the address while the parcel is `registered`.
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<WriteOutcome>;
    /// Removes the parcel while it is `registered`.
    fn delete(&self, number: ParcelNumber) -> RepoResult<WriteOutcome>;
}

/// SQLite-backed parcel store over a caller-owned connection.
pub struct SqliteParcelStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParcelStore<'conn> {
    /// Constructs a store from a connection carrying the `parcel` schema.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema is
    ///   absent or incomplete.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_parcel_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Resolves a zero-row conditional write into a precise outcome.
    fn classify_miss(&self, number: ParcelNumber) -> RepoResult<WriteOutcome> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM parcel WHERE number = ?1);",
            [number],
            |row| row.get(0),
        )?;

        if exists == 1 {
            Ok(WriteOutcome::PreconditionFailed)
        } else {
            Ok(WriteOutcome::NotFound)
        }
    }
}

impl ParcelStore for SqliteParcelStore<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        parcel.validate()?;

        self.conn.execute(
            "INSERT INTO parcel (client, status, address, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                parcel.client,
                parcel.status.as_str(),
                parcel.address.as_str(),
                parcel.created_at.as_str(),
            ],
        )?;

        let number = self.conn.last_insert_rowid();
        info!(
            "event=parcel_add module=repo status=ok number={} client={}",
            number, parcel.client
        );
        Ok(number)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{PARCEL_SELECT_SQL}
             WHERE number = ?1
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query([number])?;
        if let Some(row) = rows.next()? {
            return parse_parcel_row(row);
        }

        Err(RepoError::NotFound(number))
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{PARCEL_SELECT_SQL}
             WHERE client = ?1
             ORDER BY number ASC;"
        ))?;

        let mut rows = stmt.query([client])?;
        let mut parcels = Vec::new();
        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        debug!(
            "event=parcel_list module=repo status=ok client={} count={}",
            client,
            parcels.len()
        );
        Ok(parcels)
    }

    fn set_status(
        &self,
        number: ParcelNumber,
        status: &ParcelStatus,
    ) -> RepoResult<WriteOutcome> {
        let changed = self.conn.execute(
            "UPDATE parcel
             SET status = ?1
             WHERE number = ?2;",
            params![status.as_str(), number],
        )?;

        let outcome = if changed == 0 {
            WriteOutcome::NotFound
        } else {
            WriteOutcome::Applied
        };
        info!(
            "event=parcel_set_status module=repo status=ok number={} parcel_status={} outcome={}",
            number,
            status,
            outcome.as_str()
        );
        Ok(outcome)
    }

    fn advance_status(
        &self,
        number: ParcelNumber,
        from: &ParcelStatus,
        to: &ParcelStatus,
    ) -> RepoResult<WriteOutcome> {
        let changed = self.conn.execute(
            "UPDATE parcel
             SET status = ?1
             WHERE number = ?2
               AND status = ?3;",
            params![to.as_str(), number, from.as_str()],
        )?;

        let outcome = if changed == 0 {
            self.classify_miss(number)?
        } else {
            WriteOutcome::Applied
        };
        info!(
            "event=parcel_advance_status module=repo status=ok number={} from={} to={} outcome={}",
            number,
            from,
            to,
            outcome.as_str()
        );
        Ok(outcome)
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<WriteOutcome> {
        let changed = self.conn.execute(
            "UPDATE parcel
             SET address = ?1
             WHERE number = ?2
               AND status = ?3;",
            params![address, number, ParcelStatus::Registered.as_str()],
        )?;

        let outcome = if changed == 0 {
            self.classify_miss(number)?
        } else {
            WriteOutcome::Applied
        };
        info!(
            "event=parcel_set_address module=repo status=ok number={} outcome={}",
            number,
            outcome.as_str()
        );
        Ok(outcome)
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<WriteOutcome> {
        let changed = self.conn.execute(
            "DELETE FROM parcel
             WHERE number = ?1
               AND status = ?2;",
            params![number, ParcelStatus::Registered.as_str()],
        )?;

        let outcome = if changed == 0 {
            self.classify_miss(number)?
        } else {
            WriteOutcome::Applied
        };
        info!(
            "event=parcel_delete module=repo status=ok number={} outcome={}",
            number,
            outcome.as_str()
        );
        Ok(outcome)
    }
}

fn parse_parcel_row(row: &Row<'_>) -> RepoResult<Parcel> {
    let number: ParcelNumber = row.get("number")?;
    let status: String = row.get("status")?;

    let parcel = Parcel {
        number,
        client: row.get("client")?,
        status: ParcelStatus::from(status),
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    };
    parcel
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("parcel {number}: {err}")))?;
    Ok(parcel)
}

fn ensure_parcel_connection_ready(conn: &Connection) -> RepoResult<()> {
    if !table_exists(conn, PARCEL_TABLE)? {
        return Err(RepoError::MissingRequiredTable(PARCEL_TABLE));
    }

    for column in PARCEL_COLUMNS {
        if !table_has_column(conn, PARCEL_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
