//! Hierarchy read back from SQL stores.
//!
//! Read strategies rebuild at most [`READ_LIMIT`] forums, each with at most [`READ_LIMIT`]
//! threads holding at most [`READ_LIMIT`] posts. They differ only in how the work is split
//! between the database and the application.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use crate::bail;
use crate::error::{ErrorKind, SeedError, SeedResult};

/// Fan-out limit applied at every level when reading the hierarchy back.
pub const READ_LIMIT: i64 = 10;

/// How the hierarchy is reconstructed from the three tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadStrategy {
    /// A single query nesting aggregated JSON through ranked subqueries.
    Subquery,
    /// A single query nesting aggregated JSON through lateral joins. Postgres only.
    Lateral,
    /// One query for the forums, then one query per forum and per thread.
    Application,
}

impl ReadStrategy {
    pub const ALL: [ReadStrategy; 3] = [
        ReadStrategy::Subquery,
        ReadStrategy::Lateral,
        ReadStrategy::Application,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadStrategy::Subquery => "subquery",
            ReadStrategy::Lateral => "lateral",
            ReadStrategy::Application => "application",
        }
    }
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadStrategy {
    type Err = SeedError;

    fn from_str(value: &str) -> SeedResult<Self> {
        match value {
            "subquery" => Ok(ReadStrategy::Subquery),
            "lateral" => Ok(ReadStrategy::Lateral),
            "application" => Ok(ReadStrategy::Application),
            other => bail!(
                ErrorKind::ConfigError,
                "Unknown read strategy",
                format!("`{other}` is not one of subquery, lateral, application")
            ),
        }
    }
}

/// A forum with its threads as returned by a read strategy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForumTree {
    pub forum_id: String,
    pub name: String,
    pub body: String,
    pub created: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub threads: Vec<ThreadTree>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadTree {
    pub forum_id: String,
    pub thread_id: String,
    pub name: String,
    pub body: String,
    pub created: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub posts: Vec<PostTree>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostTree {
    pub thread_id: String,
    pub post_id: String,
    pub name: String,
    pub body: String,
    pub created: String,
}

/// Aggregated JSON columns are `null` when nothing matched.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Parses the JSON document produced for one forum by the single query strategies.
pub fn decode_forum(data: &str) -> SeedResult<ForumTree> {
    Ok(serde_json::from_str(data)?)
}

/// Number of records returned at each level by a read strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HierarchyCounts {
    pub forums: usize,
    pub threads: usize,
    pub posts: usize,
}

impl HierarchyCounts {
    pub fn of(forums: &[ForumTree]) -> Self {
        let threads = forums.iter().map(|forum| forum.threads.len()).sum();
        let posts = forums
            .iter()
            .flat_map(|forum| forum.threads.iter())
            .map(|thread| thread.posts.len())
            .sum();

        Self {
            forums: forums.len(),
            threads,
            posts,
        }
    }
}

impl fmt::Display for HierarchyCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "forums: {}, threads: {}, posts: {}",
            self.forums, self.threads, self.posts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forum_document_decodes_with_nested_levels() {
        let data = r#"{
            "forum_id": "f1", "name": "Forum.", "body": "Lorem ipsum dolor.", "created": "2024-05-01T10:00:00",
            "threads": [
                {"forum_id": "f1", "thread_id": "t1", "name": "Thread.", "body": "Sit amet.", "created": "2024-05-01T10:00:01",
                 "posts": [
                    {"thread_id": "t1", "post_id": "p1", "name": "Post.", "body": "Elit.", "created": "2024-05-01T10:00:02"},
                    {"thread_id": "t1", "post_id": "p2", "name": "Post.", "body": "Elit.", "created": "2024-05-01T10:00:03"}
                 ]},
                {"forum_id": "f1", "thread_id": "t2", "name": "Thread.", "body": "Sit amet.", "created": "2024-05-01T10:00:04",
                 "posts": null}
            ]
        }"#;

        let forum = decode_forum(data).unwrap();
        let counts = HierarchyCounts::of(&[forum]);

        assert_eq!(
            counts,
            HierarchyCounts {
                forums: 1,
                threads: 2,
                posts: 2
            }
        );
    }

    #[test]
    fn truncated_document_is_a_deserialization_error() {
        let err = decode_forum(r#"{"forum_id": "f1""#).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }

    #[test]
    fn strategies_parse_from_their_names() {
        for strategy in [
            ReadStrategy::Subquery,
            ReadStrategy::Lateral,
            ReadStrategy::Application,
        ] {
            assert_eq!(strategy.as_str().parse::<ReadStrategy>().unwrap(), strategy);
        }

        let err = "nested".parse::<ReadStrategy>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }
}
