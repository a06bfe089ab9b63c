//! Database schema definitions.

/// Main schema SQL for initializing the database.
pub const SCHEMA: &str = r#"
-- Word packs table
CREATE TABLE IF NOT EXISTS word_packs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    source_type TEXT NOT NULL CHECK (source_type IN ('default', 'file')),
    language TEXT,
    source TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_word_packs_source_type ON word_packs(source_type);
CREATE INDEX IF NOT EXISTS idx_word_packs_language ON word_packs(source_type, language);

-- Words table; (word_pack_id, word_index) is the addressable key
CREATE TABLE IF NOT EXISTS words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word_pack_id INTEGER NOT NULL REFERENCES word_packs(id) ON DELETE CASCADE,
    word TEXT NOT NULL,
    word_index INTEGER NOT NULL,
    group_index INTEGER,
    UNIQUE (word_pack_id, word_index)
);

CREATE INDEX IF NOT EXISTS idx_words_word_pack_id ON words(word_pack_id);
"#;

/// Metadata table, created before anything else so the stored schema
/// version can be checked.
pub const META_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Drops every catalog table. Used when the stored schema version does not
/// match; the catalog is a cache of remote data and is simply rebuilt.
pub const DROP_SCHEMA: &str = r#"
DROP TABLE IF EXISTS words;
DROP TABLE IF EXISTS word_packs;
"#;

/// Schema version for stale-cache detection.
pub const SCHEMA_VERSION: u32 = 1;
