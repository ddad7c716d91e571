//! Position bookkeeping for ordered children (curricula in a course, lessons
//! in a curriculum).
//!
//! Positions are 1-based and contiguous within one parent. Every mutation is
//! planned as at most one [`Shift`] of a sibling range followed by a write of
//! the touched row, all inside the caller's transaction. The `(parent,
//! position)` unique constraints are deferred, so intermediate duplicates are
//! fine until commit.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::model::DatabaseResult;

/// Inclusive range of positions that move by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub first: i32,
    pub last: i32,
    pub delta: i32,
}

/// Where a new row lands among `len` existing siblings. Absent means append.
pub fn insert_position(requested: Option<i32>, len: i64) -> i32 {
    let append = len as i32 + 1;
    requested.map_or(append, |p| p.clamp(1, append))
}

/// Where an existing row may move to among `len` siblings (itself included).
pub fn move_position(requested: i32, len: i64) -> i32 {
    requested.clamp(1, (len as i32).max(1))
}

pub fn plan_insert(at: i32) -> Shift {
    Shift {
        first: at,
        last: i32::MAX,
        delta: 1,
    }
}

pub fn plan_remove(at: i32) -> Shift {
    Shift {
        first: at + 1,
        last: i32::MAX,
        delta: -1,
    }
}

pub fn plan_move(from: i32, to: i32) -> Option<Shift> {
    use std::cmp::Ordering;

    match from.cmp(&to) {
        Ordering::Equal => None,
        Ordering::Less => Some(Shift {
            first: from + 1,
            last: to,
            delta: -1,
        }),
        Ordering::Greater => Some(Shift {
            first: to,
            last: from - 1,
            delta: 1,
        }),
    }
}

#[derive(Debug, Clone, Copy)]
pub enum OrderedTable {
    Curricula,
    Lessons,
}

impl OrderedTable {
    fn table(self) -> &'static str {
        match self {
            Self::Curricula => "curricula",
            Self::Lessons => "lessons",
        }
    }

    fn parent_column(self) -> &'static str {
        match self {
            Self::Curricula => "course_id",
            Self::Lessons => "curriculum_id",
        }
    }

    fn parent_table(self) -> &'static str {
        match self {
            Self::Curricula => "courses",
            Self::Lessons => "curricula",
        }
    }

    /// Row lock on the parent; serializes concurrent reorders of its children.
    pub async fn lock_parent(self, conn: &mut PgConnection, parent_id: Uuid) -> DatabaseResult<()> {
        let sql = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", self.parent_table());
        sqlx::query(&sql).bind(parent_id).execute(conn).await?;
        Ok(())
    }

    pub async fn count_children(self, conn: &mut PgConnection, parent_id: Uuid) -> DatabaseResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            self.table(),
            self.parent_column()
        );
        let count: i64 = sqlx::query_scalar(&sql).bind(parent_id).fetch_one(conn).await?;
        Ok(count)
    }

    /// Applies `shift` to every sibling under `parent_id` except `skip`.
    pub async fn apply(
        self,
        conn: &mut PgConnection,
        parent_id: Uuid,
        shift: Shift,
        skip: Option<Uuid>,
    ) -> DatabaseResult<u64> {
        let sql = format!(
            "UPDATE {} SET position = position + $1 \
             WHERE {} = $2 AND position BETWEEN $3 AND $4 AND ($5::uuid IS NULL OR id <> $5)",
            self.table(),
            self.parent_column()
        );
        let result = sqlx::query(&sql)
            .bind(shift.delta)
            .bind(parent_id)
            .bind(shift.first)
            .bind(shift.last)
            .bind(skip)
            .execute(conn)
            .await?;
        tracing::trace!(
            "shifted {} {} rows by {}",
            result.rows_affected(),
            self.table(),
            shift.delta
        );
        Ok(result.rows_affected())
    }
}
