//! Blog posts

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;

use super::OrganizationMember;
use super::Row;
use super::Value;
use crate::error::FieldError;

/// Publication status of a blog post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlogStatus {
    Published,
    #[default]
    Draft,
}

impl BlogStatus {
    /// All statuses, in the order filter options list them.
    pub const ALL: [BlogStatus; 2] = [BlogStatus::Published, BlogStatus::Draft];

    /// Stored form (`PUBLISHED`, `DRAFT`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "PUBLISHED",
            Self::Draft => "DRAFT",
        }
    }

    /// Sentence-case label for filter options.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Published => "Published",
            Self::Draft => "Draft",
        }
    }

    /// Icon name shown next to the label.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Published => "check-circle-2",
            Self::Draft => "timer",
        }
    }
}

impl fmt::Display for BlogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlogStatus {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLISHED" => Ok(Self::Published),
            "DRAFT" => Ok(Self::Draft),
            other => Err(FieldError::invalid("status", other)),
        }
    }
}

/// A stored blog post.
#[derive(Debug, Clone, PartialEq)]
pub struct Blog {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub organization_id: Option<String>,
    /// Id of the authoring organization member.
    pub author_id: String,
    pub title: String,
    pub slug: String,
    pub image: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub likes: i64,
    pub status: BlogStatus,
}

/// A blog post joined with its author membership; the row of the blogs table.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogWithAuthor {
    pub blog: Blog,
    pub author: OrganizationMember,
}

impl Row for BlogWithAuthor {
    fn id(&self) -> &str {
        &self.blog.id
    }

    fn value(&self, column: &str) -> Option<Value> {
        let blog = &self.blog;
        let value = match column {
            "id" => Value::from(blog.id.as_str()),
            "created_at" => Value::from(blog.created_at),
            "updated_at" => Value::from(blog.updated_at),
            "organization_id" => Value::from(blog.organization_id.clone()),
            "author_id" => Value::from(blog.author_id.as_str()),
            "author" => Value::from(self.author.display_name()),
            "title" => Value::from(blog.title.as_str()),
            "slug" => Value::from(blog.slug.as_str()),
            "image" => Value::from(blog.image.clone()),
            "body" => Value::from(blog.body.as_str()),
            "tags" => Value::from(blog.tags.clone()),
            "likes" => Value::from(blog.likes),
            "status" => Value::from(blog.status.as_str()),
            _ => return None,
        };
        Some(value)
    }
}

/// Fields for creating a blog post.
///
/// Id, slug and timestamps are assigned by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlog {
    pub author_id: String,
    pub organization_id: Option<String>,
    pub title: String,
    pub body: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub status: BlogStatus,
}

impl NewBlog {
    /// Creates a draft post by the given author member.
    pub fn new(author_id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            organization_id: None,
            title: title.into(),
            body: body.into(),
            image: None,
            tags: Vec::new(),
            status: BlogStatus::Draft,
        }
    }

    pub fn organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn status(mut self, status: BlogStatus) -> Self {
        self.status = status;
        self
    }
}

/// Fields for updating a blog post. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    /// `Some(None)` clears the image.
    pub image: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<BlogStatus>,
}

impl BlogPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn image(mut self, image: Option<String>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn status(mut self, status: BlogStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns `true` if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.image.is_none()
            && self.tags.is_none()
            && self.status.is_none()
    }
}
