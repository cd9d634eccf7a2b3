use seed_config::shared::MySqlConnectionConfig;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bail;
use crate::error::{ErrorKind, SeedResult};
use crate::store::base::insert_error;
use crate::store::read::{
    ForumTree, PostTree, READ_LIMIT, ReadStrategy, ThreadTree, decode_forum,
};
use crate::store::{RowCounts, Store};
use crate::types::SyntheticRecord;

/// Raises the aggregation limit so ten threads holding ten long posts each fit in one value.
const SET_GROUP_CONCAT_MAX_LEN: &str = "set session group_concat_max_len = 100000000";

const SCHEMA: &[&str] = &[
    "create table if not exists forums (
        forum_id varchar(36) not null primary key,
        name text not null,
        body text not null,
        created timestamp(6) not null default current_timestamp(6)
    )",
    "create table if not exists threads (
        thread_id varchar(36) not null primary key,
        forum_id varchar(36) not null,
        name text not null,
        body text not null,
        created timestamp(6) not null default current_timestamp(6),
        index threads_forum_id_idx (forum_id),
        constraint threads_forum_id_fk foreign key (forum_id) references forums (forum_id)
    )",
    "create table if not exists posts (
        post_id varchar(36) not null primary key,
        thread_id varchar(36) not null,
        name text not null,
        body text not null,
        created timestamp(6) not null default current_timestamp(6),
        index posts_thread_id_idx (thread_id),
        constraint posts_thread_id_fk foreign key (thread_id) references threads (thread_id)
    )",
];

const SUBQUERY_READ: &str = "
select cast(json_object(
    'forum_id', f.forum_id,
    'name', f.name,
    'body', f.body,
    'created', f.created,
    'threads', t.threads
) as char) as data
from forums f
inner join (
    select t.forum_id, cast(concat('[', group_concat(json_object(
        'forum_id', t.forum_id,
        'thread_id', t.thread_id,
        'name', t.name,
        'body', t.body,
        'created', t.created,
        'posts', p.posts
    )), ']') as json) as threads
    from (
        select forum_id, thread_id, name, body, created,
            row_number() over (partition by forum_id) as rnum
        from threads
    ) t
    inner join (
        select p.thread_id, cast(concat('[', group_concat(json_object(
            'thread_id', p.thread_id,
            'post_id', p.post_id,
            'name', p.name,
            'body', p.body,
            'created', p.created
        )), ']') as json) as posts
        from (
            select thread_id, post_id, name, body, created,
                row_number() over (partition by thread_id) as rnum
            from posts
        ) p
        where p.rnum <= ?
        group by p.thread_id
    ) p using (thread_id)
    where t.rnum <= ?
    group by t.forum_id
) t using (forum_id)
limit ?";

/// MySQL store backed by a `sqlx` connection pool.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    name: Arc<str>,
    pool: MySqlPool,
}

impl MySqlStore {
    /// Connects a pool of at most `max_connections` connections to the configured database.
    ///
    /// Every connection raises `group_concat_max_len` so the subquery strategy can aggregate
    /// whole threads.
    pub async fn connect(
        name: &str,
        config: &MySqlConnectionConfig,
        max_connections: u32,
    ) -> SeedResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query(SET_GROUP_CONCAT_MAX_LEN)
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(config.with_db())
            .await?;

        info!(store = name, host = %config.host, max_connections, "connected to mysql");

        Ok(Self::from_pool(name, pool))
    }

    pub fn from_pool(name: &str, pool: MySqlPool) -> Self {
        Self {
            name: Arc::from(name),
            pool,
        }
    }

    /// Creates the `forums`, `threads` and `posts` tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> SeedResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        debug!(store = %self.name, "schema is in place");

        Ok(())
    }

    /// Reads back a bounded slice of the hierarchy with the given strategy.
    ///
    /// MySQL has no lateral joins in the supported versions, so [`ReadStrategy::Lateral`] fails
    /// with [`ErrorKind::ConfigError`].
    pub async fn read_hierarchy(&self, strategy: ReadStrategy) -> SeedResult<Vec<ForumTree>> {
        match strategy {
            ReadStrategy::Subquery => self.read_subquery().await,
            ReadStrategy::Application => self.read_application().await,
            ReadStrategy::Lateral => bail!(
                ErrorKind::ConfigError,
                "Read strategy is not supported by the store",
                format!("`{strategy}` is not available for mysql")
            ),
        }
    }

    async fn read_subquery(&self) -> SeedResult<Vec<ForumTree>> {
        let rows: Vec<String> = sqlx::query_scalar(SUBQUERY_READ)
            .bind(READ_LIMIT)
            .bind(READ_LIMIT)
            .bind(READ_LIMIT)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|data| decode_forum(data)).collect()
    }

    async fn read_application(&self) -> SeedResult<Vec<ForumTree>> {
        let forums: Vec<(String, String, String, String)> = sqlx::query_as(
            "select forum_id, name, body, cast(created as char) from forums limit ?",
        )
        .bind(READ_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let mut trees = Vec::with_capacity(forums.len());
        for (forum_id, name, body, created) in forums {
            let threads: Vec<(String, String, String, String, String)> = sqlx::query_as(
                "select forum_id, thread_id, name, body, cast(created as char)
                 from threads where forum_id = ? limit ?",
            )
            .bind(&forum_id)
            .bind(READ_LIMIT)
            .fetch_all(&self.pool)
            .await?;

            let mut thread_trees = Vec::with_capacity(threads.len());
            for (forum_id, thread_id, name, body, created) in threads {
                let posts: Vec<(String, String, String, String, String)> = sqlx::query_as(
                    "select thread_id, post_id, name, body, cast(created as char)
                     from posts where thread_id = ? limit ?",
                )
                .bind(&thread_id)
                .bind(READ_LIMIT)
                .fetch_all(&self.pool)
                .await?;

                let posts = posts
                    .into_iter()
                    .map(|(thread_id, post_id, name, body, created)| PostTree {
                        thread_id,
                        post_id,
                        name,
                        body,
                        created,
                    })
                    .collect();

                thread_trees.push(ThreadTree {
                    forum_id,
                    thread_id,
                    name,
                    body,
                    created,
                    posts,
                });
            }

            trees.push(ForumTree {
                forum_id,
                name,
                body,
                created,
                threads: thread_trees,
            });
        }

        Ok(trees)
    }
}

impl Store for MySqlStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn shutdown(&self) -> SeedResult<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn insert_container(&self, record: &SyntheticRecord) -> SeedResult<()> {
        sqlx::query("insert into forums (forum_id, name, body) values (?, ?, ?)")
            .bind(record.id.to_string())
            .bind(&record.name)
            .bind(&record.body)
            .execute(&self.pool)
            .await
            .map_err(insert_error)?;

        Ok(())
    }

    async fn insert_group(&self, container_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        sqlx::query("insert into threads (forum_id, thread_id, name, body) values (?, ?, ?, ?)")
            .bind(container_id.to_string())
            .bind(record.id.to_string())
            .bind(&record.name)
            .bind(&record.body)
            .execute(&self.pool)
            .await
            .map_err(insert_error)?;

        Ok(())
    }

    async fn insert_item(&self, group_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        sqlx::query("insert into posts (thread_id, post_id, name, body) values (?, ?, ?, ?)")
            .bind(group_id.to_string())
            .bind(record.id.to_string())
            .bind(&record.name)
            .bind(&record.body)
            .execute(&self.pool)
            .await
            .map_err(insert_error)?;

        Ok(())
    }

    async fn count_rows(&self) -> SeedResult<RowCounts> {
        let (containers, groups, items): (i64, i64, i64) = sqlx::query_as(
            "select
                (select count(*) from forums),
                (select count(*) from threads),
                (select count(*) from posts)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RowCounts {
            containers: containers as u64,
            groups: groups as u64,
            items: items as u64,
        })
    }
}
