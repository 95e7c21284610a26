pub const SCHEMA: &str = r#"
-- Projects are identified by their immutable, creator-chosen slug.
-- The two revision pointers are the heart of the publish model: draft_revision
-- always names the single mutable version, latest_revision the newest
-- published one (NULL until the first publish). Projects are only ever
-- soft-deleted.
CREATE TABLE IF NOT EXISTS projects (
    slug TEXT PRIMARY KEY,
    idp_user_id TEXT NOT NULL,
    git_url TEXT,
    latest_revision INTEGER,
    draft_revision INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    deleted_at TEXT
);

-- One row per draft or published revision. published_at IS NULL marks the
-- draft; at most one such row may exist per project. Once published_at is set
-- the row (and its files) never changes again.
CREATE TABLE IF NOT EXISTS versions (
    id INTEGER PRIMARY KEY,
    project_slug TEXT NOT NULL REFERENCES projects(slug) ON DELETE CASCADE,
    revision INTEGER NOT NULL DEFAULT 0,
    app_metadata TEXT NOT NULL DEFAULT '{}',
    published_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(project_slug, revision)
);

-- Per-version file records. Content lives in the content store keyed by
-- sha256; identical bytes are stored once across all revisions. Deletion is
-- logical (deleted_at) and re-upload of the same path overwrites the row, so
-- history referenced by published revisions is never destroyed.
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    version_id INTEGER NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    dir TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL,
    ext TEXT NOT NULL DEFAULT '',
    mimetype TEXT NOT NULL,
    size_of_content INTEGER NOT NULL,
    sha256 TEXT NOT NULL,
    image_width INTEGER,
    image_height INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    deleted_at TEXT,

    UNIQUE(version_id, dir, name, ext)
);

-- Badges that have pinged the hub. The mac, once learned, is kept.
CREATE TABLE IF NOT EXISTS registered_badges (
    id TEXT PRIMARY KEY,
    mac TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    last_seen_at TEXT DEFAULT (datetime('now'))
);

-- Raw per-(badge, version) usage counters reported by devices.
CREATE TABLE IF NOT EXISTS version_reports (
    registered_badge_id TEXT NOT NULL REFERENCES registered_badges(id) ON DELETE CASCADE,
    version_id INTEGER NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    install_count INTEGER NOT NULL DEFAULT 0,
    launch_count INTEGER NOT NULL DEFAULT 0,
    crash_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (registered_badge_id, version_id)
);

-- Distinct-install aggregate per project, rebuilt by refresh_install_counts().
-- Read by the listing engine for installs-sorted pages; staleness is bounded
-- by the caller's refresh cadence, not by this schema.
CREATE TABLE IF NOT EXISTS project_install_reports (
    project_slug TEXT PRIMARY KEY REFERENCES projects(slug) ON DELETE CASCADE,
    distinct_installs INTEGER NOT NULL DEFAULT 0,
    refreshed_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_versions_project ON versions(project_slug);
CREATE INDEX IF NOT EXISTS idx_files_version ON files(version_id);
CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(idp_user_id);
CREATE INDEX IF NOT EXISTS idx_version_reports_version ON version_reports(version_id);
"#;
