//! SQLite-based storage implementation.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{
    params, params_from_iter, Connection, OpenFlags, OptionalExtension, TransactionBehavior,
};
use tracing::{debug, info, warn};

use wordpack_core::{
    now_millis, CatalogError, CatalogStore, DatabaseConfig, DefaultSource, Language, NewWord,
    PackId, PackSource, Result, SourceType, Word, WordPack, WordPackInfo,
};

use crate::schema::{DROP_SCHEMA, META_SCHEMA, SCHEMA, SCHEMA_VERSION};

const PACK_COLUMNS: &str = "id, name, created_at, source_type, source";
const WORD_COLUMNS: &str = "id, word_pack_id, word, word_index, group_index";

/// SQLite-based catalog store.
///
/// The connection sits behind a blocking Mutex. Mutations additionally run
/// in an `IMMEDIATE` transaction, so index assignment, row insertion and
/// group bookkeeping are serialized against every other writer, including
/// other processes sharing the same database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>, config: &DatabaseConfig) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CatalogError::database(format!("Failed to open database: {}", e)))?;

        Self::init(conn, path, config)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CatalogError::database(format!("Failed to open in-memory database: {}", e))
        })?;

        Self::init(conn, Path::new(":memory:"), &DatabaseConfig::default())
    }

    /// Initialize the store with a connection.
    fn init(conn: Connection, path: &Path, config: &DatabaseConfig) -> Result<Self> {
        Self::configure_connection(&conn, config)?;
        Self::ensure_schema(&conn)?;

        info!("Catalog database opened at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Configure SQLite connection.
    fn configure_connection(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
        let journal_mode = if config.wal_mode { "WAL" } else { "DELETE" };
        conn.execute_batch(&format!(
            r#"
            PRAGMA journal_mode = {};
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = {};
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            "#,
            journal_mode, config.busy_timeout_ms
        ))
        .map_err(|e| CatalogError::database(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Create the schema, discarding tables written by another schema version.
    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(META_SCHEMA)
            .map_err(|e| CatalogError::database(format!("Failed to create meta table: {}", e)))?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM catalog_meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(db)?;

        let current = SCHEMA_VERSION.to_string();
        if let Some(version) = stored.as_deref() {
            if version != current {
                warn!(
                    "Discarding catalog with schema version {} (expected {})",
                    version, current
                );
                conn.execute_batch(DROP_SCHEMA).map_err(db)?;
            }
        }

        conn.execute_batch(SCHEMA)
            .map_err(|e| CatalogError::database(format!("Failed to initialize schema: {}", e)))?;

        conn.execute(
            "INSERT OR REPLACE INTO catalog_meta (key, value) VALUES ('schema_version', ?1)",
            params![current],
        )
        .map_err(db)?;

        Ok(())
    }

    /// Close the underlying connection.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| CatalogError::database(e.to_string()))?;
        conn.close()
            .map_err(|(_, e)| CatalogError::database(format!("Failed to close database: {}", e)))?;
        debug!("Catalog database closed");
        Ok(())
    }

    /// Execute a read on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::database(e.to_string()))?;
        f(&conn)
    }

    /// Execute `f` inside one write transaction.
    ///
    /// The transaction is committed only if `f` succeeds; any error drops
    /// it, which rolls back every statement `f` executed.
    fn with_tx<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CatalogError::database(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db)?;

        let value = f(&tx)?;

        tx.commit().map_err(db)?;
        Ok(value)
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    // Lifecycle

    async fn initialize(&self) -> Result<()> {
        self.with_tx(|conn| {
            let placeholders = (1..=Language::ALL.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            let unsupported = conn
                .execute(
                    &format!(
                        "DELETE FROM word_packs WHERE source_type = 'default' \
                         AND (language IS NULL OR language NOT IN ({}))",
                        placeholders
                    ),
                    params_from_iter(Language::ALL.iter().map(|l| l.code())),
                )
                .map_err(db)?;
            if unsupported > 0 {
                warn!("Discarded {} default pack(s) with unsupported language", unsupported);
            }

            for language in Language::ALL {
                let rows = query_packs(
                    conn,
                    "WHERE source_type = 'default' AND language = ?1 ORDER BY id",
                    params![language.code()],
                )?;

                let mut kept: Option<PackId> = None;
                for row in rows {
                    let id = row.id;
                    let usable = match row.into_pack() {
                        Ok(pack) => pack
                            .default_source()
                            .map_or(false, |s| s.language == language && s.is_consistent()),
                        Err(_) => false,
                    };

                    if usable && kept.is_none() {
                        kept = Some(id);
                    } else {
                        warn!("Discarding stale default pack {} for {}", id, language);
                        delete_pack_rows(conn, id)?;
                    }
                }

                if kept.is_none() {
                    let source = PackSource::Default(DefaultSource::new(language));
                    let id = insert_pack(conn, language.code(), now_millis(), &source)?;
                    info!(
                        "Seeded default pack {} for {} with {} remote groups",
                        id,
                        language,
                        language.group_count()
                    );
                }
            }

            Ok(())
        })
    }

    async fn clear(&self) -> Result<()> {
        self.with_tx(|conn| {
            conn.execute("DELETE FROM words", []).map_err(db)?;
            conn.execute("DELETE FROM word_packs", []).map_err(db)?;
            debug!("Cleared catalog");
            Ok(())
        })
    }

    // Pack operations

    async fn list_packs(&self) -> Result<Vec<WordPack>> {
        self.with_conn(|conn| {
            query_packs(conn, "ORDER BY id", [])?
                .into_iter()
                .map(PackRow::into_pack)
                .collect()
        })
    }

    async fn get_pack(&self, id: PackId) -> Result<WordPack> {
        self.with_conn(|conn| {
            load_pack(conn, id)?
                .ok_or(CatalogError::PackNotFound { id })?
                .into_pack()
        })
    }

    async fn get_default_pack(&self, language: Language) -> Result<WordPack> {
        self.with_conn(|conn| {
            query_packs(
                conn,
                "WHERE source_type = 'default' AND language = ?1 ORDER BY id LIMIT 1",
                params![language.code()],
            )?
            .into_iter()
            .next()
            .ok_or(CatalogError::DefaultPackNotFound { language })?
            .into_pack()
        })
    }

    async fn list_pack_infos(&self) -> Result<Vec<WordPackInfo>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT p.id, p.name, p.source_type, COUNT(w.id)
                    FROM word_packs p
                    LEFT JOIN words w ON w.word_pack_id = p.id
                    GROUP BY p.id
                    ORDER BY p.id
                    "#,
                )
                .map_err(db)?;

            let infos = stmt
                .query_map([], |row| {
                    let source_type: String = row.get(2)?;
                    Ok(WordPackInfo {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        is_default: source_type == SourceType::Default.as_str(),
                        word_count: row.get::<_, i64>(3)? as u64,
                    })
                })
                .map_err(db)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db)?;

            Ok(infos)
        })
    }

    // Word operations

    async fn list_words(&self, pack_id: PackId) -> Result<Vec<Word>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM words WHERE word_pack_id = ?1 ORDER BY word_index",
                    WORD_COLUMNS
                ))
                .map_err(db)?;

            let words = stmt
                .query_map(params![pack_id], Self::row_to_word)
                .map_err(db)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db)?;

            Ok(words)
        })
    }

    async fn get_word(&self, pack_id: PackId, index: u64) -> Result<Option<Word>> {
        let Ok(index) = i64::try_from(index) else {
            return Ok(None);
        };

        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM words WHERE word_pack_id = ?1 AND word_index = ?2",
                    WORD_COLUMNS
                ),
                params![pack_id, index],
                Self::row_to_word,
            )
            .optional()
            .map_err(db)
        })
    }

    async fn word_count(&self, pack_id: PackId) -> Result<u64> {
        self.with_conn(|conn| count_words(conn, pack_id))
    }

    async fn append_words(&self, words: &[NewWord], group: Option<u32>) -> Result<Vec<Word>> {
        let pack_id = batch_pack_id(words)?;

        self.with_tx(|conn| {
            let pack = load_pack(conn, pack_id)?
                .ok_or(CatalogError::PackNotFound { id: pack_id })?
                .into_pack()?;

            let start = count_words(conn, pack_id)?;
            let stored = insert_words(
                conn,
                pack_id,
                start,
                words.iter().map(|w| w.word.as_str()),
                group,
            )?;

            if let Some(group) = group {
                let mut source = match pack.source {
                    PackSource::Default(source) => source,
                    PackSource::File => {
                        return Err(CatalogError::invalid_argument(format!(
                            "pack {} is a file pack and has no remote groups",
                            pack_id
                        )));
                    }
                };

                if !source.mark_merged(group) {
                    return Err(CatalogError::GroupAlreadySaved { pack_id, group });
                }
                update_source(conn, pack_id, &source)?;

                info!(
                    "Merged group {} into pack {} ({} words, {} local / {} remote groups)",
                    group,
                    pack_id,
                    stored.len(),
                    source.local_groups.len(),
                    source.remote_groups.len()
                );
            } else {
                debug!("Appended {} words to pack {}", stored.len(), pack_id);
            }

            Ok(stored)
        })
    }

    // File packs

    async fn add_file_word_pack(&self, name: &str, words: &[String]) -> Result<PackId> {
        if name.trim().is_empty() {
            return Err(CatalogError::invalid_argument("word pack name is empty"));
        }

        // Words are stored verbatim; index equals position in `words`.
        self.with_tx(|conn| {
            let id = insert_pack(conn, name, now_millis(), &PackSource::File)?;
            insert_words(conn, id, 0, words.iter().map(String::as_str), None)?;
            info!("Created file pack {} ({:?}, {} words)", id, name, words.len());
            Ok(id)
        })
    }

    async fn delete_file_word_pack(&self, id: PackId) -> Result<()> {
        self.with_tx(|conn| {
            let row = load_pack(conn, id)?.ok_or(CatalogError::PackNotFound { id })?;
            if row.source_type != SourceType::File.as_str() {
                return Err(CatalogError::invalid_argument(format!(
                    "pack {} is not a file pack",
                    id
                )));
            }

            let words = delete_pack_rows(conn, id)?;
            info!("Deleted file pack {} and {} words", id, words);
            Ok(())
        })
    }
}

// Helper methods
impl SqliteStore {
    /// Convert a row to a Word.
    fn row_to_word(row: &rusqlite::Row<'_>) -> rusqlite::Result<Word> {
        Ok(Word {
            id: row.get(0)?,
            pack_id: row.get(1)?,
            word: row.get(2)?,
            index: row.get::<_, i64>(3)? as u64,
            group_index: row.get(4)?,
        })
    }
}

/// A pack row before its source payload is decoded.
struct PackRow {
    id: PackId,
    name: String,
    created_at: u64,
    source_type: String,
    source: String,
}

impl PackRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get::<_, i64>(2)? as u64,
            source_type: row.get(3)?,
            source: row.get(4)?,
        })
    }

    fn into_pack(self) -> Result<WordPack> {
        let source = match self.source_type.parse::<SourceType>()? {
            SourceType::Default => PackSource::Default(serde_json::from_str(&self.source)?),
            SourceType::File => PackSource::File,
        };

        Ok(WordPack {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            source,
        })
    }
}

fn db(e: rusqlite::Error) -> CatalogError {
    CatalogError::database(e.to_string())
}

/// Reject empty batches and batches spanning several packs.
fn batch_pack_id(words: &[NewWord]) -> Result<PackId> {
    let first = words
        .first()
        .ok_or_else(|| CatalogError::invalid_batch("batch is empty"))?;

    if let Some(other) = words.iter().find(|w| w.pack_id != first.pack_id) {
        return Err(CatalogError::invalid_batch(format!(
            "batch spans packs {} and {}",
            first.pack_id, other.pack_id
        )));
    }

    Ok(first.pack_id)
}

fn query_packs<P: rusqlite::Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> Result<Vec<PackRow>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM word_packs {}", PACK_COLUMNS, clause))
        .map_err(db)?;

    let rows = stmt
        .query_map(params, PackRow::from_row)
        .map_err(db)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db)?;

    Ok(rows)
}

fn load_pack(conn: &Connection, id: PackId) -> Result<Option<PackRow>> {
    conn.query_row(
        &format!("SELECT {} FROM word_packs WHERE id = ?1", PACK_COLUMNS),
        params![id],
        PackRow::from_row,
    )
    .optional()
    .map_err(db)
}

fn insert_pack(
    conn: &Connection,
    name: &str,
    created_at: u64,
    source: &PackSource,
) -> Result<PackId> {
    let (language, payload) = match source {
        PackSource::Default(s) => (Some(s.language.code()), serde_json::to_string(s)?),
        PackSource::File => (None, "{}".to_string()),
    };

    conn.execute(
        "INSERT INTO word_packs (name, created_at, source_type, language, source) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            created_at as i64,
            source.source_type().as_str(),
            language,
            payload
        ],
    )
    .map_err(|e| CatalogError::database(format!("Failed to insert word pack: {}", e)))?;

    Ok(conn.last_insert_rowid())
}

fn update_source(conn: &Connection, id: PackId, source: &DefaultSource) -> Result<()> {
    let payload = serde_json::to_string(source)?;
    conn.execute(
        "UPDATE word_packs SET source = ?1 WHERE id = ?2",
        params![payload, id],
    )
    .map_err(db)?;
    Ok(())
}

fn count_words(conn: &Connection, pack_id: PackId) -> Result<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM words WHERE word_pack_id = ?1",
            params![pack_id],
            |row| row.get(0),
        )
        .map_err(db)?;
    Ok(count as u64)
}

/// Insert words with consecutive indices starting at `start`.
fn insert_words<'a>(
    conn: &Connection,
    pack_id: PackId,
    start: u64,
    words: impl Iterator<Item = &'a str>,
    group: Option<u32>,
) -> Result<Vec<Word>> {
    let mut stmt = conn
        .prepare(
            "INSERT INTO words (word_pack_id, word, word_index, group_index) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(db)?;

    let mut stored = Vec::new();
    let mut index = start;
    for word in words {
        let id = stmt
            .insert(params![pack_id, word, index as i64, group])
            .map_err(|e| CatalogError::database(format!("Failed to insert word: {}", e)))?;

        stored.push(Word {
            id,
            pack_id,
            word: word.to_string(),
            index,
            group_index: group,
        });
        index += 1;
    }

    Ok(stored)
}

/// Delete a pack and all of its words. Returns the number of words removed.
fn delete_pack_rows(conn: &Connection, id: PackId) -> Result<usize> {
    let words = conn
        .execute("DELETE FROM words WHERE word_pack_id = ?1", params![id])
        .map_err(db)?;
    conn.execute("DELETE FROM word_packs WHERE id = ?1", params![id])
        .map_err(db)?;
    Ok(words)
}
