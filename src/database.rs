//! Database initialization, table definitions and record access
//!
//! Everything is kept in a single embedded redb file. Records are stored as
//! JSON strings; secondary lookups (by owner, by topic) go through multimap
//! index tables that map a key to the aliases it covers.

use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, MultimapTableDefinition, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::model::{ClickRecord, SessionRecord, UrlRecord, UserRecord};
use crate::oauth::{IdentityProvider, ProviderProfile};

/// Main table for storing URL records
///
/// Key: alias (e.g. "abc123"). Value: JSON-serialized [`UrlRecord`].
/// Keying by alias is what makes aliases globally unique.
pub const TABLE_URLS: TableDefinition<&str, &str> = TableDefinition::new("urls_v1");

/// Owner index: user id -> aliases created by that user
pub const TABLE_OWNER_INDEX: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("owner_index_v1");

/// Topic index: topic label -> aliases carrying that label
pub const TABLE_TOPIC_INDEX: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("topic_index_v1");

/// Append-only click log
///
/// Key: `(alias, sequence)` where the sequence counts up from 0 per alias, so
/// a range scan over one alias yields its clicks in insertion order.
/// Value: JSON-serialized [`ClickRecord`].
pub const TABLE_CLICKS: TableDefinition<(&str, u64), &str> = TableDefinition::new("clicks_v1");

/// Users by internal id, JSON-serialized [`UserRecord`]
pub const TABLE_USERS: TableDefinition<&str, &str> = TableDefinition::new("users_v1");

/// Provider subject -> internal user id
pub const TABLE_USER_SUBJECTS: TableDefinition<&str, &str> =
    TableDefinition::new("user_subjects_v1");

/// Session token -> JSON-serialized [`SessionRecord`]
pub const TABLE_SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("sessions_v1");

const SESSION_TOKEN_LEN: usize = 48;
const USER_ID_LEN: usize = 16;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    /// OAuth provider used by the login flow
    pub identity: Arc<dyn IdentityProvider>,
}

/// Initializes the embedded database and creates required tables
///
/// Creates or opens the database file at `db_path`, then opens every table
/// once inside a write transaction so later read transactions never hit a
/// missing table.
///
/// # Example
///
/// ```no_run
/// # use linklens::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_URLS)?;
        write_txn.open_multimap_table(TABLE_OWNER_INDEX)?;
        write_txn.open_multimap_table(TABLE_TOPIC_INDEX)?;
        write_txn.open_table(TABLE_CLICKS)?;
        write_txn.open_table(TABLE_USERS)?;
        write_txn.open_table(TABLE_USER_SUBJECTS)?;
        write_txn.open_table(TABLE_SESSIONS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Random alphanumeric string, used for aliases, user ids, tokens and OAuth state
pub fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn read_url<T>(table: &T, alias: &str) -> Result<Option<UrlRecord>, AppError>
where
    T: ReadableTable<&'static str, &'static str>,
{
    match table.get(alias)? {
        Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
        None => Ok(None),
    }
}

/// Stores a new URL record together with its owner and topic index entries
///
/// Returns `Ok(false)` without writing anything if the alias is already taken.
pub fn insert_url(db: &Database, record: &UrlRecord) -> Result<bool, AppError> {
    let record_json = serde_json::to_string(record)?;

    let write_txn = db.begin_write()?;
    let taken = {
        let mut urls = write_txn.open_table(TABLE_URLS)?;
        let taken = urls.get(record.alias.as_str())?.is_some();

        if !taken {
            urls.insert(record.alias.as_str(), record_json.as_str())?;

            let mut owners = write_txn.open_multimap_table(TABLE_OWNER_INDEX)?;
            owners.insert(record.owner_id.as_str(), record.alias.as_str())?;

            let mut topics = write_txn.open_multimap_table(TABLE_TOPIC_INDEX)?;
            topics.insert(record.topic.as_str(), record.alias.as_str())?;
        }
        taken
    };

    if taken {
        write_txn.abort()?;
        return Ok(false);
    }

    write_txn.commit()?;
    Ok(true)
}

pub fn find_url(db: &Database, alias: &str) -> Result<Option<UrlRecord>, AppError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_URLS)?;
    read_url(&table, alias)
}

fn urls_by_index(
    db: &Database,
    index: MultimapTableDefinition<'static, &'static str, &'static str>,
    key: &str,
) -> Result<Vec<UrlRecord>, AppError> {
    let read_txn = db.begin_read()?;
    let index_table = read_txn.open_multimap_table(index)?;
    let urls = read_txn.open_table(TABLE_URLS)?;

    let mut records = Vec::new();
    for alias in index_table.get(key)? {
        let alias = alias?;
        if let Some(record) = read_url(&urls, alias.value())? {
            records.push(record);
        }
    }

    // Index values come back in alias order; callers expect creation order
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.alias.cmp(&b.alias))
    });
    Ok(records)
}

/// All URLs created by `owner_id`, oldest first
pub fn urls_by_owner(db: &Database, owner_id: &str) -> Result<Vec<UrlRecord>, AppError> {
    urls_by_index(db, TABLE_OWNER_INDEX, owner_id)
}

/// All URLs labelled `topic`, oldest first
pub fn urls_by_topic(db: &Database, topic: &str) -> Result<Vec<UrlRecord>, AppError> {
    urls_by_index(db, TABLE_TOPIC_INDEX, topic)
}

/// Records one traversal of `alias`
///
/// The URL lookup and the click insert share one write transaction: either
/// the alias exists and exactly one click is appended, or nothing is written
/// and `Ok(None)` is returned.
pub fn record_click(
    db: &Database,
    alias: &str,
    user_agent: &str,
    ip_address: &str,
) -> Result<Option<UrlRecord>, AppError> {
    let write_txn = db.begin_write()?;

    let url = {
        let urls = write_txn.open_table(TABLE_URLS)?;
        read_url(&urls, alias)?
    };
    let Some(url) = url else {
        write_txn.abort()?;
        return Ok(None);
    };

    let click = ClickRecord {
        alias: alias.to_string(),
        timestamp: Utc::now(),
        user_agent: user_agent.to_string(),
        ip_address: ip_address.to_string(),
    };
    let click_json = serde_json::to_string(&click)?;

    {
        let mut clicks = write_txn.open_table(TABLE_CLICKS)?;
        let next_seq = match clicks.range((alias, 0u64)..=(alias, u64::MAX))?.next_back() {
            Some(last) => last?.0.value().1 + 1,
            None => 0,
        };
        clicks.insert((alias, next_seq), click_json.as_str())?;
    }

    write_txn.commit()?;
    Ok(Some(url))
}

/// Every click recorded for the given aliases, grouped by alias in the order given
pub fn clicks_for<'a, I>(db: &Database, aliases: I) -> Result<Vec<ClickRecord>, AppError>
where
    I: IntoIterator<Item = &'a str>,
{
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_CLICKS)?;

    let mut clicks = Vec::new();
    for alias in aliases {
        for entry in table.range((alias, 0u64)..=(alias, u64::MAX))? {
            let (_, value) = entry?;
            clicks.push(serde_json::from_str::<ClickRecord>(value.value())?);
        }
    }
    Ok(clicks)
}

/// Creates the user for a provider profile, or refreshes the name and email
/// of the existing one
pub fn upsert_user(db: &Database, profile: &ProviderProfile) -> Result<UserRecord, AppError> {
    let write_txn = db.begin_write()?;
    let user = {
        let mut subjects = write_txn.open_table(TABLE_USER_SUBJECTS)?;
        let mut users = write_txn.open_table(TABLE_USERS)?;

        let existing_id = subjects
            .get(profile.subject.as_str())?
            .map(|id| id.value().to_string());

        let existing = match &existing_id {
            Some(id) => match users.get(id.as_str())? {
                Some(value) => Some(serde_json::from_str::<UserRecord>(value.value())?),
                None => None,
            },
            None => None,
        };

        let user = match existing {
            Some(user) => UserRecord {
                display_name: profile.display_name.clone(),
                email: profile.email.clone(),
                ..user
            },
            None => UserRecord {
                id: existing_id.unwrap_or_else(|| random_token(USER_ID_LEN)),
                subject: profile.subject.clone(),
                display_name: profile.display_name.clone(),
                email: profile.email.clone(),
                created_at: Utc::now(),
            },
        };

        let user_json = serde_json::to_string(&user)?;
        users.insert(user.id.as_str(), user_json.as_str())?;
        subjects.insert(user.subject.as_str(), user.id.as_str())?;
        user
    };
    write_txn.commit()?;

    Ok(user)
}

pub fn find_user(db: &Database, user_id: &str) -> Result<Option<UserRecord>, AppError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_USERS)?;
    match table.get(user_id)? {
        Some(value) => Ok(Some(serde_json::from_str(value.value())?)),
        None => Ok(None),
    }
}

fn session_expired(value: &str, now: DateTime<Utc>) -> bool {
    serde_json::from_str::<SessionRecord>(value)
        .map(|session| session.is_expired(now))
        .unwrap_or(false)
}

/// Opens a session for `user_id` and returns its token
///
/// Sessions that have already expired are dropped in the same transaction.
pub fn create_session(db: &Database, user_id: &str, ttl: Duration) -> Result<String, AppError> {
    let token = random_token(SESSION_TOKEN_LEN);
    let now = Utc::now();
    let session = SessionRecord {
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now + ttl,
    };
    let session_json = serde_json::to_string(&session)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_SESSIONS)?;
        table.retain(|_, value| !session_expired(value, now))?;
        table.insert(token.as_str(), session_json.as_str())?;
    }
    write_txn.commit()?;

    Ok(token)
}

/// Looks up a live session
///
/// An expired session is reported as absent and its row is deleted.
pub fn find_session(db: &Database, token: &str) -> Result<Option<SessionRecord>, AppError> {
    let session = {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(TABLE_SESSIONS)?;
        match table.get(token)? {
            Some(value) => serde_json::from_str::<SessionRecord>(value.value())?,
            None => return Ok(None),
        }
    };

    if session.is_expired(Utc::now()) {
        delete_session(db, token)?;
        tracing::debug!("Removed expired session");
        return Ok(None);
    }
    Ok(Some(session))
}

pub fn delete_session(db: &Database, token: &str) -> Result<(), AppError> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_SESSIONS)?;
        table.remove(token)?;
    }
    write_txn.commit()?;
    Ok(())
}
