use seed_config::shared::{IntoConnectOptions, PgConnectionConfig, SEED_PG_OPTIONS};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SeedResult;
use crate::store::base::insert_error;
use crate::store::read::{
    ForumTree, PostTree, READ_LIMIT, ReadStrategy, ThreadTree, decode_forum,
};
use crate::store::{RowCounts, Store};
use crate::types::SyntheticRecord;

const SCHEMA: &[&str] = &[
    "create table if not exists forums (
        forum_id varchar(36) primary key,
        name text not null,
        body text not null,
        created timestamp not null default now()
    )",
    "create table if not exists threads (
        thread_id varchar(36) primary key,
        forum_id varchar(36) not null references forums (forum_id),
        name text not null,
        body text not null,
        created timestamp not null default now()
    )",
    "create index if not exists threads_forum_id_idx on threads (forum_id)",
    "create table if not exists posts (
        post_id varchar(36) primary key,
        thread_id varchar(36) not null references threads (thread_id),
        name text not null,
        body text not null,
        created timestamp not null default now()
    )",
    "create index if not exists posts_thread_id_idx on posts (thread_id)",
];

const SUBQUERY_READ: &str = "
select json_build_object(
    'forum_id', f.forum_id,
    'name', f.name,
    'body', f.body,
    'created', f.created,
    'threads', t.threads
)::text as data
from forums f
inner join (
    select t.forum_id, json_agg(json_build_object(
        'forum_id', t.forum_id,
        'thread_id', t.thread_id,
        'name', t.name,
        'body', t.body,
        'created', t.created,
        'posts', p.posts
    )) as threads
    from (
        select forum_id, thread_id, name, body, created,
            row_number() over (partition by forum_id) as rnum
        from threads
    ) t
    inner join (
        select p.thread_id, json_agg(json_build_object(
            'thread_id', p.thread_id,
            'post_id', p.post_id,
            'name', p.name,
            'body', p.body,
            'created', p.created
        )) as posts
        from (
            select thread_id, post_id, name, body, created,
                row_number() over (partition by thread_id) as rnum
            from posts
        ) p
        where p.rnum <= $1
        group by p.thread_id
    ) p using (thread_id)
    where t.rnum <= $1
    group by t.forum_id
) t using (forum_id)
limit $1";

const LATERAL_READ: &str = "
select json_build_object(
    'forum_id', f.forum_id,
    'name', f.name,
    'body', f.body,
    'created', f.created,
    'threads', json_agg(t2.thread)
)::text as data
from forums f
join lateral (
    select t.forum_id, t.thread_id, json_build_object(
        'forum_id', t.forum_id,
        'thread_id', t.thread_id,
        'name', t.name,
        'body', t.body,
        'created', t.created,
        'posts', json_agg(p2.post)
    ) as thread
    from threads t
    join lateral (
        select json_build_object(
            'thread_id', p.thread_id,
            'post_id', p.post_id,
            'name', p.name,
            'body', p.body,
            'created', p.created
        ) as post
        from posts p
        where p.thread_id = t.thread_id
        limit $1
    ) p2 on true
    where t.forum_id = f.forum_id
    group by t.forum_id, t.thread_id
    limit $1
) t2 on true
group by f.forum_id
limit $1";

/// Postgres store backed by a `sqlx` connection pool.
///
/// Ids are stored as their hyphenated textual form.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    name: Arc<str>,
    pool: PgPool,
}

impl PostgresStore {
    /// Connects a pool of at most `max_connections` connections to the configured database.
    pub async fn connect(
        name: &str,
        config: &PgConnectionConfig,
        max_connections: u32,
    ) -> SeedResult<Self> {
        let options = config.with_db(Some(&SEED_PG_OPTIONS));

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!(store = name, host = %config.host, max_connections, "connected to postgres");

        Ok(Self::from_pool(name, pool))
    }

    pub fn from_pool(name: &str, pool: PgPool) -> Self {
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
    /// Every strategy is supported.
    pub async fn read_hierarchy(&self, strategy: ReadStrategy) -> SeedResult<Vec<ForumTree>> {
        match strategy {
            ReadStrategy::Subquery => self.read_single_query(SUBQUERY_READ).await,
            ReadStrategy::Lateral => self.read_single_query(LATERAL_READ).await,
            ReadStrategy::Application => self.read_application().await,
        }
    }

    async fn read_single_query(&self, query: &str) -> SeedResult<Vec<ForumTree>> {
        let rows: Vec<String> = sqlx::query_scalar(query)
            .bind(READ_LIMIT)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|data| decode_forum(data)).collect()
    }

    async fn read_application(&self) -> SeedResult<Vec<ForumTree>> {
        let forums: Vec<(String, String, String, String)> = sqlx::query_as(
            "select forum_id, name, body, created::text from forums limit $1",
        )
        .bind(READ_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let mut trees = Vec::with_capacity(forums.len());
        for (forum_id, name, body, created) in forums {
            let threads: Vec<(String, String, String, String, String)> = sqlx::query_as(
                "select forum_id, thread_id, name, body, created::text
                 from threads where forum_id = $1 limit $2",
            )
            .bind(&forum_id)
            .bind(READ_LIMIT)
            .fetch_all(&self.pool)
            .await?;

            let mut thread_trees = Vec::with_capacity(threads.len());
            for (forum_id, thread_id, name, body, created) in threads {
                let posts: Vec<(String, String, String, String, String)> = sqlx::query_as(
                    "select thread_id, post_id, name, body, created::text
                     from posts where thread_id = $1 limit $2",
                )
                .bind(&thread_id)
                .bind(READ_LIMIT)
                .fetch_all(&self.pool)
                .await?;

                thread_trees.push(ThreadTree {
                    forum_id,
                    thread_id,
                    name,
                    body,
                    created,
                    posts: posts
                        .into_iter()
                        .map(|(thread_id, post_id, name, body, created)| PostTree {
                            thread_id,
                            post_id,
                            name,
                            body,
                            created,
                        })
                        .collect(),
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

impl Store for PostgresStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn shutdown(&self) -> SeedResult<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn insert_container(&self, record: &SyntheticRecord) -> SeedResult<()> {
        sqlx::query("insert into forums (forum_id, name, body) values ($1, $2, $3)")
            .bind(record.id.to_string())
            .bind(&record.name)
            .bind(&record.body)
            .execute(&self.pool)
            .await
            .map_err(insert_error)?;

        Ok(())
    }

    async fn insert_group(&self, container_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        sqlx::query(
            "insert into threads (forum_id, thread_id, name, body) values ($1, $2, $3, $4)",
        )
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
        sqlx::query("insert into posts (thread_id, post_id, name, body) values ($1, $2, $3, $4)")
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
