//! Entity schemas for the Stack Exchange data dump
//!
//! One static [`EntitySchema`] per dump file. Each column pairs its store type
//! (used for the idempotent `CREATE TABLE`) with the coercion rule applied to
//! raw attribute text on the way in.

use crate::error::{IngestError, Result};
use serde::Serialize;

/// How raw attribute text for a column becomes a typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionKind {
    /// Numeric identifier or counter; digit strings become integers
    IntegerOpaque,
    /// `YYYY-MM-DDTHH:MM:SS.ffffff` text, stored as epoch seconds
    Timestamp,
    /// Whitespace-separated class list; only the first token is kept
    MultivalueFirst,
    Text,
}

/// Store type affinity of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Integer,
    Text,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "integer",
            SqlType::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub kind: CoercionKind,
    pub primary_key: bool,
}

impl Column {
    /// The record's own `id` attribute; never auto-generated
    pub const fn key(name: &'static str) -> Self {
        Self {
            name,
            sql_type: SqlType::Integer,
            kind: CoercionKind::IntegerOpaque,
            primary_key: true,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            sql_type: SqlType::Integer,
            kind: CoercionKind::IntegerOpaque,
            primary_key: false,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            sql_type: SqlType::Text,
            kind: CoercionKind::Text,
            primary_key: false,
        }
    }

    pub const fn epoch(name: &'static str) -> Self {
        Self {
            name,
            sql_type: SqlType::Integer,
            kind: CoercionKind::Timestamp,
            primary_key: false,
        }
    }

    pub const fn first_of(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            kind: CoercionKind::MultivalueFirst,
            primary_key: false,
        }
    }
}

/// Table layout and source file of one dump entity
#[derive(Debug, Serialize)]
pub struct EntitySchema {
    pub name: &'static str,
    pub source_file: &'static str,
    pub columns: &'static [Column],
}

impl EntitySchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<CoercionKind> {
        self.column(name).map(|c| c.kind)
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` for this entity
    pub fn ddl(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("    {} {}", quote_ident(c.name), c.sql_type.as_sql());
                if c.primary_key {
                    def.push_str(" PRIMARY KEY");
                }
                def
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            quote_ident(self.name),
            columns.join(",\n")
        )
    }
}

/// Quote an SQL identifier, doubling any embedded quote.
///
/// Attribute names come from the source file, so every identifier placed in
/// generated SQL goes through here.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// =============================================================================
// Dump tables
// =============================================================================

pub static BADGES: EntitySchema = EntitySchema {
    name: "badges",
    source_file: "Badges.xml",
    columns: &[
        Column::key("id"),
        Column::integer("userid"),
        Column::text("name"),
        Column::epoch("date"),
        Column::first_of("class", SqlType::Integer),
        Column::text("tagbased"),
    ],
};

pub static COMMENTS: EntitySchema = EntitySchema {
    name: "comments",
    source_file: "Comments.xml",
    columns: &[
        Column::key("id"),
        Column::integer("userid"),
        Column::integer("postid"),
        Column::text("text"),
        Column::integer("score"),
        Column::epoch("creationdate"),
    ],
};

pub static POSTS: EntitySchema = EntitySchema {
    name: "posts",
    source_file: "Posts.xml",
    columns: &[
        Column::key("id"),
        Column::integer("posttypeid"),
        Column::integer("parentid"),
        Column::text("tags"),
        Column::integer("score"),
        Column::integer("commentcount"),
        Column::text("title"),
        Column::integer("owneruserid"),
        Column::text("ownerdisplayname"),
        Column::integer("favoritecount"),
        Column::integer("viewcount"),
        Column::integer("answercount"),
        Column::integer("acceptedanswerid"),
        Column::text("body"),
        Column::epoch("communityowneddate"),
        Column::text("lasteditordisplayname"),
        Column::integer("lasteditoruserid"),
        Column::epoch("creationdate"),
        Column::epoch("lastactivitydate"),
        Column::epoch("lasteditdate"),
        Column::epoch("closeddate"),
    ],
};

pub static POST_HISTORY: EntitySchema = EntitySchema {
    name: "posthistory",
    source_file: "PostHistory.xml",
    columns: &[
        Column::key("id"),
        Column::integer("userid"),
        Column::integer("postid"),
        Column::integer("posthistorytypeid"),
        Column::text("comment"),
        Column::text("userdisplayname"),
        Column::text("text"),
        Column::text("revisionguid"),
        Column::epoch("creationdate"),
        Column::integer("closereasonid"),
    ],
};

pub static POST_LINKS: EntitySchema = EntitySchema {
    name: "postlinks",
    source_file: "PostLinks.xml",
    columns: &[
        Column::key("id"),
        Column::integer("postid"),
        Column::integer("relatedpostid"),
        Column::integer("linktypeid"),
        Column::epoch("creationdate"),
    ],
};

pub static TAGS: EntitySchema = EntitySchema {
    name: "tags",
    source_file: "Tags.xml",
    columns: &[
        Column::key("id"),
        Column::text("tagname"),
        Column::integer("count"),
        Column::integer("wikipostid"),
        Column::integer("excerptpostid"),
    ],
};

pub static USERS: EntitySchema = EntitySchema {
    name: "users",
    source_file: "Users.xml",
    columns: &[
        Column::key("id"),
        Column::text("displayname"),
        Column::integer("accountid"),
        Column::text("aboutme"),
        Column::integer("age"),
        Column::text("emailhash"),
        Column::text("websiteurl"),
        Column::text("profileimageurl"),
        Column::integer("reputation"),
        Column::integer("upvotes"),
        Column::integer("downvotes"),
        Column::integer("views"),
        Column::epoch("creationdate"),
        Column::epoch("lastaccessdate"),
        Column::text("location"),
    ],
};

pub static VOTES: EntitySchema = EntitySchema {
    name: "votes",
    source_file: "Votes.xml",
    columns: &[
        Column::key("id"),
        Column::integer("postid"),
        Column::integer("votetypeid"),
        Column::epoch("creationdate"),
        Column::integer("userid"),
        Column::integer("bountyamount"),
    ],
};

/// Load order of a default run
pub static STACK_EXCHANGE: [&EntitySchema; 8] = [
    &BADGES,
    &COMMENTS,
    &POSTS,
    &POST_HISTORY,
    &POST_LINKS,
    &TAGS,
    &USERS,
    &VOTES,
];

/// Fixed mapping from entity name to schema.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: Vec<&'static EntitySchema>,
}

impl SchemaRegistry {
    pub fn new(schemas: impl IntoIterator<Item = &'static EntitySchema>) -> Self {
        Self {
            schemas: schemas.into_iter().collect(),
        }
    }

    /// All eight Stack Exchange dump entities
    pub fn stack_exchange() -> Self {
        Self::new(STACK_EXCHANGE)
    }

    /// Look up an entity; an unknown name is a configuration error
    pub fn schema_for(&self, entity: &str) -> Result<&'static EntitySchema> {
        self.schemas
            .iter()
            .copied()
            .find(|s| s.name == entity)
            .ok_or_else(|| {
                IngestError::config(format!(
                    "unknown entity '{}' (known: {})",
                    entity,
                    self.entity_names().join(", ")
                ))
            })
    }

    pub fn ddl_for(&self, entity: &str) -> Result<String> {
        self.schema_for(entity).map(EntitySchema::ddl)
    }

    /// Entity names in registration order
    pub fn entity_names(&self) -> Vec<&'static str> {
        self.schemas.iter().map(|s| s.name).collect()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::stack_exchange()
    }
}
