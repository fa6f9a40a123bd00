//! SQLite-backed store for organizations, members and blogs.

use std::collections::BTreeSet;
use std::path::Path;

use async_sqlite::Client;
use async_sqlite::ClientBuilder;
use async_sqlite::JournalMode;
use async_sqlite::rusqlite;
use async_sqlite::rusqlite::OptionalExtension;
use async_sqlite::rusqlite::functions::FunctionFlags;
use async_sqlite::rusqlite::types::ToSqlOutput;
use async_sqlite::rusqlite::types::Type;
use async_sqlite::rusqlite::types::ValueRef;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use super::Gateway;
use super::ensure_non_empty;
use crate::error::GatewayError;
use crate::model::Blog;
use crate::model::BlogPatch;
use crate::model::BlogStatus;
use crate::model::BlogWithAuthor;
use crate::model::NewBlog;
use crate::model::NewMember;
use crate::model::NewOrganization;
use crate::model::Organization;
use crate::model::OrganizationMember;
use crate::model::OrganizationPatch;
use crate::model::Role;
use crate::model::Value;
use crate::model::slugify;
use crate::query::Filter;
use crate::query::ListRequest;
use crate::query::sql::SqlColumns;
use crate::query::sql::SqlFragment;
use crate::query::sql::filter_to_sql;
use crate::query::sql::order_to_sql;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS organization (
        id TEXT PRIMARY KEY,
        created_at INTEGER,
        updated_at INTEGER,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT,
        logo TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS organization_member (
        id TEXT PRIMARY KEY,
        created_at INTEGER,
        updated_at INTEGER,
        user_id TEXT NOT NULL,
        organization_id TEXT NOT NULL REFERENCES organization(id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        org_metadata TEXT NOT NULL DEFAULT '{}',
        UNIQUE (user_id, organization_id)
    );
    CREATE TABLE IF NOT EXISTS blog (
        id TEXT PRIMARY KEY,
        created_at INTEGER,
        updated_at INTEGER,
        organization_id TEXT REFERENCES organization(id) ON DELETE SET NULL,
        author_id TEXT NOT NULL REFERENCES organization_member(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        image TEXT,
        body TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '[]',
        likes INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'DRAFT'
    );
    CREATE INDEX IF NOT EXISTS idx_blog_created_at ON blog(created_at);
    CREATE INDEX IF NOT EXISTS idx_member_organization ON organization_member(organization_id);
";

const BLOG_SELECT: &str = "
    SELECT b.id, b.created_at, b.updated_at, b.organization_id, b.author_id,
           b.title, b.slug, b.image, b.body, b.tags, b.likes, b.status,
           m.id, m.created_at, m.updated_at, m.user_id, m.organization_id, m.role, m.org_metadata
    FROM blog b
    JOIN organization_member m ON m.id = b.author_id";

const BLOG_FROM: &str = "FROM blog b JOIN organization_member m ON m.id = b.author_id";

/// Column ids accepted by [`BlogGateway`] and the SQL they map to.
pub const BLOG_COLUMNS: SqlColumns = SqlColumns::new(&[
    ("id", "b.id"),
    ("created_at", "b.created_at"),
    ("updated_at", "b.updated_at"),
    ("organization_id", "b.organization_id"),
    ("author_id", "b.author_id"),
    (
        "author",
        "COALESCE(json_extract(m.org_metadata, '$.display_name'), m.user_id)",
    ),
    ("title", "b.title"),
    ("slug", "b.slug"),
    ("image", "b.image"),
    ("body", "b.body"),
    ("tags", "b.tags"),
    ("likes", "b.likes"),
    ("status", "b.status"),
]);

const ORGANIZATION_SELECT: &str =
    "SELECT id, created_at, updated_at, name, slug, description, logo FROM organization";

/// Column ids accepted by [`OrganizationGateway`] and the SQL they map to.
pub const ORGANIZATION_COLUMNS: SqlColumns = SqlColumns::new(&[
    ("id", "id"),
    ("created_at", "created_at"),
    ("updated_at", "updated_at"),
    ("name", "name"),
    ("slug", "slug"),
    ("description", "description"),
    ("logo", "logo"),
]);

const MEMBER_SELECT: &str =
    "SELECT id, created_at, updated_at, user_id, organization_id, role, org_metadata FROM organization_member";

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        let output = match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Timestamp(t) => ToSqlOutput::Owned(Sql::Integer(t.timestamp_millis())),
            Value::List(items) => ToSqlOutput::Owned(Sql::Text(
                serde_json::to_string(items).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
            )),
            Value::Json(json) => ToSqlOutput::Owned(Sql::Text(json.to_string())),
        };
        Ok(output)
    }
}

/// The SQLite database behind the gateways.
///
/// Cloning is cheap; clones share one connection.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), blogdesk_lib::error::GatewayError> {
/// use blogdesk_lib::gateway::SqliteStore;
///
/// let store = SqliteStore::open("blogdesk.db").await?;
/// let blogs = store.blogs();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqliteStore {
    client: Client,
}

impl SqliteStore {
    /// Opens (or creates) a database file in WAL mode and bootstraps the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let client = ClientBuilder::new()
            .path(path)
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    /// Opens a private in-memory database. Data is lost when the store is dropped.
    pub async fn open_in_memory() -> Result<Self, GatewayError> {
        let client = ClientBuilder::new().path(":memory:").open().await?;

        Self::init_schema(&client).await?;

        Ok(Self { client })
    }

    async fn init_schema(client: &Client) -> Result<(), GatewayError> {
        client
            .conn(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                register_casefold(conn)?;
                conn.execute_batch(SCHEMA)
            })
            .await?;
        Ok(())
    }

    /// Gateway for the blogs table.
    pub fn blogs(&self) -> BlogGateway {
        BlogGateway {
            client: self.client.clone(),
        }
    }

    /// Gateway for the organizations table.
    pub fn organizations(&self) -> OrganizationGateway {
        OrganizationGateway {
            client: self.client.clone(),
        }
    }

    /// Adds a user to an organization.
    pub async fn add_member(&self, member: NewMember) -> Result<OrganizationMember, GatewayError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();
        let metadata = serde_json::json!({ "display_name": member.display_name }).to_string();
        let organization_id = member.organization_id.clone();

        let inserted = {
            let id = id.clone();
            self.client
                .conn(move |conn| {
                    if !exists(conn, "SELECT EXISTS(SELECT 1 FROM organization WHERE id = ?)", &member.organization_id)? {
                        return Ok(false);
                    }
                    conn.execute(
                        "INSERT INTO organization_member
                            (id, created_at, updated_at, user_id, organization_id, role, org_metadata)
                         VALUES (?, ?, ?, ?, ?, ?, ?)",
                        rusqlite::params![
                            id,
                            now,
                            now,
                            member.user_id,
                            member.organization_id,
                            member.role.as_str(),
                            metadata
                        ],
                    )?;
                    Ok(true)
                })
                .await?
        };
        if !inserted {
            return Err(GatewayError::rejected(format!(
                "unknown organization '{}'",
                organization_id
            )));
        }

        log::info!("Added member {} to organization {}", id, organization_id);
        let member = self.member(&id).await?;
        member.ok_or(GatewayError::NotFound(id))
    }

    /// Looks up a membership by id.
    pub async fn member(&self, id: &str) -> Result<Option<OrganizationMember>, GatewayError> {
        let id = id.to_string();
        let member = self
            .client
            .conn(move |conn| {
                conn.query_row(&format!("{} WHERE id = ?", MEMBER_SELECT), [id], |row| {
                    member_from_row(row, 0)
                })
                .optional()
            })
            .await?;
        Ok(member)
    }

    /// Lists the members of an organization, oldest first.
    pub async fn members(&self, organization_id: &str) -> Result<Vec<OrganizationMember>, GatewayError> {
        let organization_id = organization_id.to_string();
        let members = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE organization_id = ? ORDER BY created_at, id",
                    MEMBER_SELECT
                ))?;
                let rows = stmt.query_map([organization_id], |row| member_from_row(row, 0))?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;
        Ok(members)
    }
}

/// Blogs joined with their author membership.
#[derive(Clone)]
pub struct BlogGateway {
    client: Client,
}

impl BlogGateway {
    /// Looks up one blog by id.
    pub async fn get(&self, id: &str) -> Result<Option<BlogWithAuthor>, GatewayError> {
        let id = id.to_string();
        let blog = self
            .client
            .conn(move |conn| {
                conn.query_row(&format!("{} WHERE b.id = ?", BLOG_SELECT), [id], blog_from_row)
                    .optional()
            })
            .await?;
        Ok(blog)
    }

    async fn fetch(&self, id: String) -> Result<BlogWithAuthor, GatewayError> {
        let blog = self.get(&id).await?;
        blog.ok_or(GatewayError::NotFound(id))
    }
}

#[async_trait]
impl Gateway for BlogGateway {
    type Row = BlogWithAuthor;
    type Fields = NewBlog;
    type Patch = BlogPatch;

    async fn list(&self, request: &ListRequest) -> Result<Vec<BlogWithAuthor>, GatewayError> {
        let (sql, params) = list_sql(BLOG_SELECT, "b.id", &BLOG_COLUMNS, request)?;
        log::debug!("Listing blogs: {}", sql);
        let rows = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), blog_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;
        Ok(rows)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, GatewayError> {
        count(&self.client, BLOG_FROM, &BLOG_COLUMNS, filter).await
    }

    async fn create(&self, fields: NewBlog) -> Result<BlogWithAuthor, GatewayError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();
        let slug = slugify(&fields.title);
        let tags = tags_json(&fields.tags)?;
        let author_id = fields.author_id.clone();

        let inserted = {
            let id = id.clone();
            self.client
                .conn(move |conn| {
                    if !exists(
                        conn,
                        "SELECT EXISTS(SELECT 1 FROM organization_member WHERE id = ?)",
                        &fields.author_id,
                    )? {
                        return Ok(false);
                    }
                    conn.execute(
                        "INSERT INTO blog
                            (id, created_at, updated_at, organization_id, author_id,
                             title, slug, image, body, tags, likes, status)
                         VALUES (?, ?, ?,
                                 COALESCE(?, (SELECT organization_id FROM organization_member WHERE id = ?)),
                                 ?, ?, ?, ?, ?, ?, 0, ?)",
                        rusqlite::params![
                            id,
                            now,
                            now,
                            fields.organization_id,
                            fields.author_id,
                            fields.author_id,
                            fields.title,
                            slug,
                            fields.image,
                            fields.body,
                            tags,
                            fields.status.as_str()
                        ],
                    )?;
                    Ok(true)
                })
                .await?
        };
        if !inserted {
            return Err(GatewayError::rejected(format!("unknown author '{}'", author_id)));
        }

        log::info!("Created blog {}", id);
        self.fetch(id).await
    }

    async fn update(&self, id: &str, patch: BlogPatch) -> Result<BlogWithAuthor, GatewayError> {
        let mut sets = vec!["updated_at = ?"];
        let mut params = vec![Value::Int(Utc::now().timestamp_millis())];
        if let Some(title) = patch.title {
            sets.push("title = ?");
            sets.push("slug = ?");
            let slug = slugify(&title);
            params.push(Value::Text(title));
            params.push(Value::Text(slug));
        }
        if let Some(body) = patch.body {
            sets.push("body = ?");
            params.push(Value::Text(body));
        }
        if let Some(image) = patch.image {
            sets.push("image = ?");
            params.push(Value::from(image));
        }
        if let Some(tags) = patch.tags {
            sets.push("tags = ?");
            params.push(Value::Text(tags_json(&tags)?));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            params.push(Value::Text(status.as_str().to_string()));
        }
        params.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE blog SET {} WHERE id = ?", sets.join(", "));
        let changed = self
            .client
            .conn(move |conn| conn.execute(&sql, rusqlite::params_from_iter(params.iter())))
            .await?;
        if changed == 0 {
            return Err(GatewayError::NotFound(id.to_string()));
        }

        log::info!("Updated blog {}", id);
        self.fetch(id.to_string()).await
    }

    async fn delete(&self, ids: &BTreeSet<String>) -> Result<(), GatewayError> {
        ensure_non_empty(ids)?;
        delete_all(&self.client, "blog", ids).await?;
        log::info!("Deleted {} blog(s)", ids.len());
        Ok(())
    }
}

/// Organizations.
#[derive(Clone)]
pub struct OrganizationGateway {
    client: Client,
}

impl OrganizationGateway {
    /// Looks up one organization by id.
    pub async fn get(&self, id: &str) -> Result<Option<Organization>, GatewayError> {
        let id = id.to_string();
        let organization = self
            .client
            .conn(move |conn| {
                conn.query_row(
                    &format!("{} WHERE id = ?", ORGANIZATION_SELECT),
                    [id],
                    organization_from_row,
                )
                .optional()
            })
            .await?;
        Ok(organization)
    }

    async fn fetch(&self, id: String) -> Result<Organization, GatewayError> {
        let organization = self.get(&id).await?;
        organization.ok_or(GatewayError::NotFound(id))
    }
}

#[async_trait]
impl Gateway for OrganizationGateway {
    type Row = Organization;
    type Fields = NewOrganization;
    type Patch = OrganizationPatch;

    async fn list(&self, request: &ListRequest) -> Result<Vec<Organization>, GatewayError> {
        let (sql, params) = list_sql(ORGANIZATION_SELECT, "id", &ORGANIZATION_COLUMNS, request)?;
        log::debug!("Listing organizations: {}", sql);
        let rows = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), organization_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;
        Ok(rows)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, GatewayError> {
        count(&self.client, "FROM organization", &ORGANIZATION_COLUMNS, filter).await
    }

    async fn create(&self, fields: NewOrganization) -> Result<Organization, GatewayError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();
        let slug = slugify(&fields.name);

        let inserted = {
            let id = id.clone();
            let slug = slug.clone();
            self.client
                .conn(move |conn| {
                    if exists(conn, "SELECT EXISTS(SELECT 1 FROM organization WHERE slug = ?)", &slug)? {
                        return Ok(false);
                    }
                    conn.execute(
                        "INSERT INTO organization (id, created_at, updated_at, name, slug, description, logo)
                         VALUES (?, ?, ?, ?, ?, ?, ?)",
                        rusqlite::params![id, now, now, fields.name, slug, fields.description, fields.logo],
                    )?;
                    Ok(true)
                })
                .await?
        };
        if !inserted {
            return Err(GatewayError::rejected(format!("slug '{}' is already taken", slug)));
        }

        log::info!("Created organization {} ({})", id, slug);
        self.fetch(id).await
    }

    async fn update(&self, id: &str, patch: OrganizationPatch) -> Result<Organization, GatewayError> {
        let mut sets = vec!["updated_at = ?"];
        let mut params = vec![Value::Int(Utc::now().timestamp_millis())];
        if let Some(name) = patch.name {
            sets.push("name = ?");
            params.push(Value::Text(name));
        }
        if let Some(description) = patch.description {
            sets.push("description = ?");
            params.push(Value::from(description));
        }
        if let Some(logo) = patch.logo {
            sets.push("logo = ?");
            params.push(Value::Text(logo));
        }
        params.push(Value::Text(id.to_string()));

        let sql = format!("UPDATE organization SET {} WHERE id = ?", sets.join(", "));
        let changed = self
            .client
            .conn(move |conn| conn.execute(&sql, rusqlite::params_from_iter(params.iter())))
            .await?;
        if changed == 0 {
            return Err(GatewayError::NotFound(id.to_string()));
        }

        log::info!("Updated organization {}", id);
        self.fetch(id.to_string()).await
    }

    async fn delete(&self, ids: &BTreeSet<String>) -> Result<(), GatewayError> {
        ensure_non_empty(ids)?;
        delete_all(&self.client, "organization", ids).await?;
        log::info!("Deleted {} organization(s)", ids.len());
        Ok(())
    }
}

/// Builds a paged `SELECT` with `tiebreak` as the last sort key so pages are stable.
fn list_sql(
    select: &str,
    tiebreak: &str,
    columns: &SqlColumns,
    request: &ListRequest,
) -> Result<(String, Vec<Value>), GatewayError> {
    let SqlFragment { sql: predicate, mut params } = filter_to_sql(&request.filter, columns)?;
    let order = match order_to_sql(&request.order, columns)? {
        Some(order) => format!("{}, {}", order, tiebreak),
        None => tiebreak.to_string(),
    };
    let sql = format!("{} WHERE {} ORDER BY {} LIMIT ? OFFSET ?", select, predicate, order);
    params.push(Value::Int(to_i64(request.pagination.limit())));
    params.push(Value::Int(to_i64(request.pagination.offset())));
    Ok((sql, params))
}

async fn count(client: &Client, from: &str, columns: &SqlColumns, filter: &Filter) -> Result<u64, GatewayError> {
    let SqlFragment { sql: predicate, params } = filter_to_sql(filter, columns)?;
    let sql = format!("SELECT COUNT(*) {} WHERE {}", from, predicate);
    log::debug!("Counting: {}", sql);
    let count = client
        .conn(move |conn| {
            conn.query_row(&sql, rusqlite::params_from_iter(params.iter()), |row| {
                row.get::<_, i64>(0)
            })
        })
        .await?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Deletes every id in one transaction. A missing id rolls the whole batch back.
async fn delete_all(client: &Client, table: &'static str, ids: &BTreeSet<String>) -> Result<(), GatewayError> {
    let ids = ids.iter().cloned().collect::<Vec<_>>();
    let missing = client
        .conn_mut(move |conn| {
            let tx = conn.transaction()?;
            for id in ids {
                let removed = tx.execute(&format!("DELETE FROM {} WHERE id = ?", table), [&id])?;
                if removed == 0 {
                    return Ok(Some(id));
                }
            }
            tx.commit()?;
            Ok(None)
        })
        .await?;
    match missing {
        Some(id) => Err(GatewayError::NotFound(id)),
        None => Ok(()),
    }
}

fn exists(conn: &rusqlite::Connection, sql: &str, param: &str) -> rusqlite::Result<bool> {
    conn.query_row(sql, [param], |row| row.get(0))
}

fn tags_json(tags: &[String]) -> Result<String, GatewayError> {
    serde_json::to_string(tags).map_err(|e| GatewayError::Decode(e.to_string()))
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn timestamp(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::from_timestamp_millis)
}

fn conversion<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

fn blog_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlogWithAuthor> {
    let tags: String = row.get(9)?;
    let status: String = row.get(11)?;
    let blog = Blog {
        id: row.get(0)?,
        created_at: timestamp(row.get(1)?),
        updated_at: timestamp(row.get(2)?),
        organization_id: row.get(3)?,
        author_id: row.get(4)?,
        title: row.get(5)?,
        slug: row.get(6)?,
        image: row.get(7)?,
        body: row.get(8)?,
        tags: serde_json::from_str(&tags).map_err(|e| conversion(9, e))?,
        likes: row.get(10)?,
        status: status.parse::<BlogStatus>().map_err(|e| conversion(11, e))?,
    };
    Ok(BlogWithAuthor {
        blog,
        author: member_from_row(row, 12)?,
    })
}

/// Reads a membership starting at column `offset`.
fn member_from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<OrganizationMember> {
    let role: String = row.get(offset + 5)?;
    let metadata: String = row.get(offset + 6)?;
    Ok(OrganizationMember {
        id: row.get(offset)?,
        created_at: timestamp(row.get(offset + 1)?),
        updated_at: timestamp(row.get(offset + 2)?),
        user_id: row.get(offset + 3)?,
        organization_id: row.get(offset + 4)?,
        role: role.parse::<Role>().map_err(|e| conversion(offset + 5, e))?,
        org_metadata: serde_json::from_str(&metadata).map_err(|e| conversion(offset + 6, e))?,
    })
}

fn organization_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        created_at: timestamp(row.get(1)?),
        updated_at: timestamp(row.get(2)?),
        name: row.get(3)?,
        slug: row.get(4)?,
        description: row.get(5)?,
        logo: row.get(6)?,
    })
}

/// `casefold(text)`: Unicode lowercase, matching how in-memory text filters
/// fold case. SQLite's own `lower()` only folds ASCII.
fn register_casefold(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}
