use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, ToSql, TransactionBehavior, params};

use super::schema::SCHEMA;
use super::{FilePath, SortKey, Store, SummaryFilter, validate_slug};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

const PROJECT_COLUMNS: &str =
    "slug, idp_user_id, git_url, latest_revision, draft_revision, created_at, updated_at, deleted_at";

fn map_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        slug: row.get(0)?,
        idp_user_id: row.get(1)?,
        git_url: row.get(2)?,
        latest_revision: row.get(3)?,
        draft_revision: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
        deleted_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

const VERSION_COLUMNS: &str =
    "v.id, v.project_slug, v.revision, v.app_metadata, v.published_at, v.created_at, v.updated_at";

fn map_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<Version> {
    let raw: String = row.get(3)?;
    let app_metadata = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Version {
        id: row.get(0)?,
        project_slug: row.get(1)?,
        revision: row.get(2)?,
        app_metadata,
        published_at: row.get::<_, Option<String>>(4)?.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const FILE_COLUMNS: &str = "id, version_id, dir, name, ext, mimetype, size_of_content, sha256, \
     image_width, image_height, created_at, updated_at, deleted_at";

fn map_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        version_id: row.get(1)?,
        dir: row.get(2)?,
        name: row.get(3)?,
        ext: row.get(4)?,
        mimetype: row.get(5)?,
        size_of_content: row.get(6)?,
        sha256: row.get(7)?,
        image_width: row.get(8)?,
        image_height: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
        updated_at: parse_datetime(&row.get::<_, String>(11)?),
        deleted_at: row
            .get::<_, Option<String>>(12)?
            .map(|s| parse_datetime(&s)),
    })
}

/// Resolves the draft version id of a live project. The draft is only
/// reachable through the project's draft pointer, never by revision number.
fn draft_version_id(conn: &Connection, slug: &str) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT v.id FROM versions v
         JOIN projects p ON p.slug = v.project_slug AND v.revision = p.draft_revision
         WHERE p.slug = ?1 AND p.deleted_at IS NULL",
        params![slug],
        |row| row.get(0),
    )
    .optional()
    .map_err(Error::from)
}

/// Escapes `%`, `_` and `\` so user input matches literally under `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Project operations

    fn insert_project(&self, project: &NewProject) -> Result<()> {
        validate_slug(&project.slug)?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM projects WHERE slug = ?1",
                params![project.slug],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(Error::AlreadyExists);
        }

        let now = format_datetime(&Utc::now());
        tx.execute(
            "INSERT INTO projects (slug, idp_user_id, git_url, draft_revision, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            params![project.slug, project.idp_user_id, project.git_url, now],
        )?;

        let app_metadata = serde_json::to_string(&AppMetadata::for_new_project(&project.slug))?;
        tx.execute(
            "INSERT INTO versions (project_slug, revision, app_metadata, created_at, updated_at)
             VALUES (?1, 0, ?2, ?3, ?3)",
            params![project.slug, app_metadata, now],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_project(&self, slug: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = ?1 AND deleted_at IS NULL"),
            params![slug],
            map_project,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_project_git_url(&self, slug: &str, git_url: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE projects SET git_url = ?1, updated_at = ?2 WHERE slug = ?3 AND deleted_at IS NULL",
            params![git_url, format_datetime(&Utc::now()), slug],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_project(&self, slug: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE projects SET deleted_at = ?1 WHERE slug = ?2 AND deleted_at IS NULL",
            params![format_datetime(&Utc::now()), slug],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Revision resolution

    fn resolve_version(&self, slug: &str, selector: RevisionSelector) -> Result<Option<Version>> {
        let conn = self.conn();

        match selector {
            RevisionSelector::Draft => conn
                .query_row(
                    &format!(
                        "SELECT {VERSION_COLUMNS} FROM versions v
                         JOIN projects p ON p.slug = v.project_slug AND v.revision = p.draft_revision
                         WHERE p.slug = ?1 AND p.deleted_at IS NULL"
                    ),
                    params![slug],
                    map_version,
                )
                .optional()
                .map_err(Error::from),
            RevisionSelector::Latest => conn
                .query_row(
                    &format!(
                        "SELECT {VERSION_COLUMNS} FROM versions v
                         JOIN projects p ON p.slug = v.project_slug AND v.revision = p.latest_revision
                         WHERE p.slug = ?1 AND p.deleted_at IS NULL"
                    ),
                    params![slug],
                    map_version,
                )
                .optional()
                .map_err(Error::from),
            // Unpublished rows are unreachable by number: revision numbers
            // promise immutability, which only published rows provide.
            RevisionSelector::Revision(n) => conn
                .query_row(
                    &format!(
                        "SELECT {VERSION_COLUMNS} FROM versions v
                         JOIN projects p ON p.slug = v.project_slug
                         WHERE p.slug = ?1 AND p.deleted_at IS NULL
                           AND v.revision = ?2 AND v.published_at IS NOT NULL"
                    ),
                    params![slug, n],
                    map_version,
                )
                .optional()
                .map_err(Error::from),
        }
    }

    fn latest_revisions(&self, slugs: Option<&[String]>) -> Result<Vec<(String, i64)>> {
        let conn = self.conn();

        let mut sql = String::from(
            "SELECT slug, latest_revision FROM projects
             WHERE deleted_at IS NULL AND latest_revision IS NOT NULL",
        );
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(slugs) = slugs {
            if slugs.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; slugs.len()].join(", ");
            sql.push_str(&format!(" AND slug IN ({placeholders})"));
            for slug in slugs {
                values.push(Box::new(slug.clone()));
            }
        }
        sql.push_str(" ORDER BY slug");

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let rows = stmt.query_map(&param_refs[..], |row| Ok((row.get(0)?, row.get(1)?)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Publishing

    fn publish_version(&self, slug: &str, clock_override: Option<DateTime<Utc>>) -> Result<()> {
        let now = format_datetime(&clock_override.unwrap_or_else(Utc::now));

        let mut conn = self.conn();
        // Immediate mode takes the write lock up front so two publishers on the
        // same database serialize instead of deadlocking mid-transaction.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let live: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM projects WHERE slug = ?1 AND deleted_at IS NULL",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;
        if live.is_none() {
            return Err(Error::NotFound);
        }

        let draft: Option<(i64, i64, String)> = tx
            .query_row(
                "SELECT v.id, v.revision, v.app_metadata FROM versions v
                 JOIN projects p ON p.slug = v.project_slug AND v.revision = p.draft_revision
                 WHERE p.slug = ?1 AND v.published_at IS NULL",
                params![slug],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((draft_id, revision, app_metadata)) = draft else {
            return Err(Error::Conflict("project has no draft to publish".to_string()));
        };

        // 1. Freeze the draft. From here on this row is immutable.
        tx.execute(
            "UPDATE versions SET published_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, draft_id],
        )?;

        // 2. Open the successor draft with the same metadata document.
        tx.execute(
            "INSERT INTO versions (project_slug, revision, app_metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![slug, revision + 1, app_metadata, now],
        )?;
        let new_draft_id = tx.last_insert_rowid();

        // 3. Carry the live file set over, timestamps included. Content is
        //    shared by digest, so this copies rows, not bytes.
        tx.execute(
            "INSERT INTO files (version_id, dir, name, ext, mimetype, size_of_content, sha256,
                                image_width, image_height, created_at, updated_at)
             SELECT ?1, dir, name, ext, mimetype, size_of_content, sha256,
                    image_width, image_height, created_at, updated_at
             FROM files WHERE version_id = ?2 AND deleted_at IS NULL",
            params![new_draft_id, draft_id],
        )?;

        // 4. Repoint. Readers see either the pre-publish or post-publish
        //    project, never a revision without its successor draft.
        tx.execute(
            "UPDATE projects SET latest_revision = ?1, draft_revision = ?2, updated_at = ?3
             WHERE slug = ?4",
            params![revision, revision + 1, now, slug],
        )?;

        tx.commit()?;
        Ok(())
    }

    // Draft mutation

    fn update_draft_metadata(&self, slug: &str, metadata: &AppMetadata) -> Result<()> {
        let app_metadata = serde_json::to_string(metadata)?;
        let conn = self.conn();

        let version_id = draft_version_id(&conn, slug)?.ok_or(Error::NotFound)?;
        conn.execute(
            "UPDATE versions SET app_metadata = ?1, updated_at = ?2 WHERE id = ?3",
            params![app_metadata, format_datetime(&Utc::now()), version_id],
        )?;
        Ok(())
    }

    fn upsert_draft_file(&self, slug: &str, path: &FilePath, upload: &UploadedFile) -> Result<()> {
        let conn = self.conn();
        let version_id = draft_version_id(&conn, slug)?.ok_or(Error::NotFound)?;

        // Same path again overwrites the live row in place; a previously
        // soft-deleted row is revived. Either way history rows of published
        // versions are untouched.
        conn.execute(
            "INSERT INTO files (version_id, dir, name, ext, mimetype, size_of_content, sha256,
                                image_width, image_height, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT (version_id, dir, name, ext) DO UPDATE SET
                mimetype = excluded.mimetype,
                size_of_content = excluded.size_of_content,
                sha256 = excluded.sha256,
                image_width = excluded.image_width,
                image_height = excluded.image_height,
                updated_at = excluded.updated_at,
                deleted_at = NULL",
            params![
                version_id,
                path.dir,
                path.name,
                path.ext,
                upload.mimetype,
                upload.size_of_content,
                upload.sha256,
                upload.image_width,
                upload.image_height,
                format_datetime(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn delete_draft_file(&self, slug: &str, path: &FilePath) -> Result<()> {
        let conn = self.conn();
        let version_id = draft_version_id(&conn, slug)?.ok_or(Error::NotFound)?;

        let rows = conn.execute(
            "UPDATE files SET deleted_at = ?1
             WHERE version_id = ?2 AND dir = ?3 AND name = ?4 AND ext = ?5 AND deleted_at IS NULL",
            params![
                format_datetime(&Utc::now()),
                version_id,
                path.dir,
                path.name,
                path.ext
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // File metadata reads

    fn get_file_metadata(
        &self,
        slug: &str,
        selector: RevisionSelector,
        path: &FilePath,
    ) -> Result<Option<FileRecord>> {
        let Some(version) = self.resolve_version(slug, selector)? else {
            return Ok(None);
        };

        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {FILE_COLUMNS} FROM files
                 WHERE version_id = ?1 AND dir = ?2 AND name = ?3 AND ext = ?4
                   AND deleted_at IS NULL"
            ),
            params![version.id, path.dir, path.name, path.ext],
            map_file,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_version_files(&self, version_id: i64) -> Result<Vec<FileRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE version_id = ?1 AND deleted_at IS NULL
             ORDER BY dir, name, ext"
        ))?;

        let rows = stmt.query_map(params![version_id], map_file)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Listing

    fn project_summaries(&self, filter: &SummaryFilter) -> Result<Vec<ProjectSummary>> {
        let mut sql = String::from(
            "SELECT p.slug, p.idp_user_id, p.git_url, v.revision, v.app_metadata,
                    v.published_at, v.updated_at, COALESCE(r.distinct_installs, 0) AS installs
             FROM projects p
             JOIN versions v ON v.project_slug = p.slug AND v.revision = p.latest_revision
             LEFT JOIN project_install_reports r ON r.project_slug = p.slug
             WHERE p.deleted_at IS NULL AND v.published_at IS NOT NULL",
        );
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        match &filter.slugs {
            Some(slugs) if slugs.is_empty() => return Ok(Vec::new()),
            Some(slugs) => {
                let placeholders = vec!["?"; slugs.len()].join(", ");
                sql.push_str(&format!(" AND p.slug IN ({placeholders})"));
                for slug in slugs {
                    values.push(Box::new(slug.clone()));
                }
            }
            // Browsing, not a direct lookup: hidden apps stay out.
            None => sql.push_str(
                " AND COALESCE(json_extract(v.app_metadata, '$.hidden'), 0) = 0",
            ),
        }

        if !filter.badges.is_empty() {
            let placeholders = vec!["?"; filter.badges.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(v.app_metadata, '$.badges')
                              WHERE json_each.value IN ({placeholders}))"
            ));
            for badge in &filter.badges {
                values.push(Box::new(badge.clone()));
            }
        }

        if !filter.categories.is_empty() {
            let placeholders = vec!["?"; filter.categories.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(v.app_metadata, '$.categories')
                              WHERE json_each.value IN ({placeholders}))"
            ));
            for category in &filter.categories {
                values.push(Box::new(category.clone()));
            }
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            sql.push_str(
                " AND (lower(COALESCE(json_extract(v.app_metadata, '$.name'), p.slug)) LIKE ? ESCAPE '\\'
                   OR lower(COALESCE(json_extract(v.app_metadata, '$.description'), '')) LIKE ? ESCAPE '\\'
                   OR p.slug LIKE ? ESCAPE '\\'
                   OR EXISTS (SELECT 1 FROM json_each(v.app_metadata, '$.categories')
                              WHERE lower(json_each.value) LIKE ? ESCAPE '\\'))",
            );
            for _ in 0..4 {
                values.push(Box::new(pattern.clone()));
            }
        }

        if let Some(user_id) = &filter.user_id {
            sql.push_str(" AND p.idp_user_id = ?");
            values.push(Box::new(user_id.clone()));
        }

        sql.push_str(match filter.sort {
            SortKey::Updated => " ORDER BY v.updated_at DESC",
            SortKey::Published => " ORDER BY v.published_at DESC",
            SortKey::Installs => " ORDER BY installs DESC, v.updated_at DESC",
        });

        if filter.page_length.is_some() || filter.page_start.is_some() {
            // LIMIT -1 means unbounded in SQLite; OFFSET still applies.
            sql.push_str(" LIMIT ? OFFSET ?");
            values.push(Box::new(filter.page_length.unwrap_or(-1)));
            values.push(Box::new(filter.page_start.unwrap_or(0)));
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();

        let rows = stmt.query_map(&param_refs[..], |row| {
            let raw: String = row.get(4)?;
            let app_metadata: AppMetadata = serde_json::from_str(&raw).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            let slug: String = row.get(0)?;

            Ok(ProjectSummary {
                name: app_metadata.name.clone().unwrap_or_else(|| slug.clone()),
                slug,
                idp_user_id: row.get(1)?,
                git_url: row.get(2)?,
                revision: row.get(3)?,
                description: app_metadata.description.clone(),
                license_type: app_metadata.license_type.clone(),
                categories: app_metadata.categories.clone(),
                badges: app_metadata.badges.clone(),
                icon_map: app_metadata.icon_map.clone(),
                hidden: app_metadata.hidden.filter(|h| *h),
                published_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                updated_at: parse_datetime(&row.get::<_, String>(6)?),
                installs: row.get(7)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Badge registry + stats

    fn register_badge(&self, id: &str, mac: Option<&str>) -> Result<()> {
        self.conn().execute(
            "INSERT INTO registered_badges (id, mac, created_at, last_seen_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT (id) DO UPDATE SET
                mac = COALESCE(registered_badges.mac, excluded.mac),
                last_seen_at = excluded.last_seen_at",
            params![id, mac, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn get_stats(&self) -> Result<HubStats> {
        let conn = self.conn();

        let apps: i64 = conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        let app_authors: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT idp_user_id) FROM projects",
            [],
            |row| row.get(0),
        )?;
        let badges: i64 =
            conn.query_row("SELECT COUNT(*) FROM registered_badges", [], |row| {
                row.get(0)
            })?;

        Ok(HubStats {
            apps,
            app_authors,
            badges,
        })
    }

    // Usage reporting

    fn record_version_report(
        &self,
        badge_id: &str,
        version_id: i64,
        kind: ReportKind,
    ) -> Result<()> {
        let (install, launch, crash) = match kind {
            ReportKind::Install => (1, 0, 0),
            ReportKind::Launch => (0, 1, 0),
            ReportKind::Crash => (0, 0, 1),
        };

        self.conn().execute(
            "INSERT INTO version_reports
                (registered_badge_id, version_id, install_count, launch_count, crash_count,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT (registered_badge_id, version_id) DO UPDATE SET
                install_count = install_count + excluded.install_count,
                launch_count = launch_count + excluded.launch_count,
                crash_count = crash_count + excluded.crash_count,
                updated_at = excluded.updated_at",
            params![
                badge_id,
                version_id,
                install,
                launch,
                crash,
                format_datetime(&Utc::now())
            ],
        )?;
        Ok(())
    }

    fn refresh_install_counts(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM project_install_reports", [])?;
        tx.execute(
            "INSERT INTO project_install_reports (project_slug, distinct_installs, refreshed_at)
             SELECT v.project_slug, COUNT(DISTINCT r.registered_badge_id), ?1
             FROM version_reports r
             JOIN versions v ON v.id = r.version_id
             WHERE r.install_count > 0
             GROUP BY v.project_slug",
            params![format_datetime(&Utc::now())],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
