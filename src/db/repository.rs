//! Database repository for CRUD operations.
//!
//! Every mutation is a single statement, so each create/update/delete is atomic
//! without explicit transactions. Sibling `sort_order` is computed inside the
//! INSERT as `max + 1` and never renumbered.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::Lookup;
use crate::errors::AppError;
use crate::metadata::normalize_trailing_slash;
use crate::models::{BookmarkedProblem, Difficulty, Problem, Subtopic, SubtopicStats, Topic};

/// Row totals across the three tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    pub topics: i64,
    pub subtopics: i64,
    pub problems: i64,
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Count rows in every table.
    pub async fn count_rows(&self) -> Result<RowCounts, AppError> {
        let row = sqlx::query(
            r#"SELECT (SELECT COUNT(*) FROM topics) AS topics,
                      (SELECT COUNT(*) FROM subtopics) AS subtopics,
                      (SELECT COUNT(*) FROM problems) AS problems"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(RowCounts {
            topics: row.get("topics"),
            subtopics: row.get("subtopics"),
            problems: row.get("problems"),
        })
    }

    // ==================== TOPIC OPERATIONS ====================

    /// List all topics in display order.
    pub async fn list_topics(&self) -> Result<Vec<Topic>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, sort_order, created_at FROM topics ORDER BY sort_order, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(topic_from_row).collect())
    }

    /// Get a topic by ID.
    pub async fn get_topic(&self, id: i64) -> Result<Option<Topic>, AppError> {
        let row = sqlx::query("SELECT id, name, sort_order, created_at FROM topics WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(topic_from_row))
    }

    /// Find a topic by its exact name.
    pub async fn find_topic_by_name(&self, name: &str) -> Result<Lookup<Topic>, AppError> {
        let row = sqlx::query("SELECT id, name, sort_order, created_at FROM topics WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(topic_from_row).into())
    }

    /// Create a new topic at the end of the topic list.
    pub async fn create_topic(&self, name: &str) -> Result<Topic, AppError> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"INSERT INTO topics (name, sort_order, created_at)
               SELECT ?, COALESCE(MAX(sort_order), 0) + 1, ? FROM topics"#,
        )
        .bind(name)
        .bind(&now)
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict("Topic already exists".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        self.get_topic(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Topic {} vanished after insert", id)))
    }

    /// Delete a topic together with its subtopics and problems.
    pub async fn delete_topic(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Topic {} not found", id)));
        }
        Ok(())
    }

    // ==================== SUBTOPIC OPERATIONS ====================

    /// List the subtopics of a topic in display order.
    pub async fn list_subtopics(&self, topic_id: i64) -> Result<Vec<Subtopic>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, topic_id, name, description, sort_order, created_at
               FROM subtopics WHERE topic_id = ? ORDER BY sort_order, id"#,
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(subtopic_from_row).collect())
    }

    /// Get a subtopic by ID.
    pub async fn get_subtopic(&self, id: i64) -> Result<Option<Subtopic>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, topic_id, name, description, sort_order, created_at
               FROM subtopics WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(subtopic_from_row))
    }

    /// Find a subtopic of a topic by exact, case-sensitive name.
    pub async fn find_subtopic_by_name(
        &self,
        topic_id: i64,
        name: &str,
    ) -> Result<Lookup<Subtopic>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, topic_id, name, description, sort_order, created_at
               FROM subtopics WHERE topic_id = ? AND name = ?
               ORDER BY sort_order, id LIMIT 1"#,
        )
        .bind(topic_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(subtopic_from_row).into())
    }

    /// Create a subtopic at the end of its topic's list.
    ///
    /// Duplicate names under the same topic are accepted here; only startup
    /// sync looks names up before inserting.
    pub async fn create_subtopic(
        &self,
        topic_id: i64,
        name: &str,
        description: &str,
    ) -> Result<Subtopic, AppError> {
        if self.get_topic(topic_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Topic {} not found", topic_id)));
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"INSERT INTO subtopics (topic_id, name, description, sort_order, created_at)
               SELECT ?, ?, ?, COALESCE(MAX(sort_order), 0) + 1, ?
               FROM subtopics WHERE topic_id = ?"#,
        )
        .bind(topic_id)
        .bind(name)
        .bind(description)
        .bind(&now)
        .bind(topic_id)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_subtopic(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Subtopic {} vanished after insert", id)))
    }

    /// Delete a subtopic together with its problems.
    pub async fn delete_subtopic(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subtopics WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Subtopic {} not found", id)));
        }
        Ok(())
    }

    /// Done/total counters for a subtopic.
    pub async fn subtopic_stats(&self, subtopic_id: i64) -> Result<SubtopicStats, AppError> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS total, COALESCE(SUM(is_done), 0) AS done
               FROM problems WHERE subtopic_id = ?"#,
        )
        .bind(subtopic_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(SubtopicStats {
            total: row.get("total"),
            done: row.get("done"),
        })
    }

    // ==================== PROBLEM OPERATIONS ====================

    /// List the problems of a subtopic in display order.
    pub async fn list_problems(&self, subtopic_id: i64) -> Result<Vec<Problem>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, subtopic_id, title, canonical_url, difficulty, is_done, is_bookmarked,
                      code_solution, code_language, sort_order, created_at
               FROM problems WHERE subtopic_id = ? ORDER BY sort_order, id"#,
        )
        .bind(subtopic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(problem_from_row).collect())
    }

    /// Get a problem by ID.
    pub async fn get_problem(&self, id: i64) -> Result<Option<Problem>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, subtopic_id, title, canonical_url, difficulty, is_done, is_bookmarked,
                      code_solution, code_language, sort_order, created_at
               FROM problems WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(problem_from_row))
    }

    /// Find a problem in a subtopic by URL, ignoring a trailing slash on either side.
    pub async fn find_problem_by_url(
        &self,
        subtopic_id: i64,
        url: &str,
    ) -> Result<Lookup<Problem>, AppError> {
        let normalized = normalize_trailing_slash(url);
        let row = sqlx::query(
            r#"SELECT id, subtopic_id, title, canonical_url, difficulty, is_done, is_bookmarked,
                      code_solution, code_language, sort_order, created_at
               FROM problems
               WHERE subtopic_id = ? AND (canonical_url = ? OR canonical_url || '/' = ?)
               ORDER BY sort_order, id LIMIT 1"#,
        )
        .bind(subtopic_id)
        .bind(&normalized)
        .bind(&normalized)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(problem_from_row).into())
    }

    /// Create a problem at the end of its subtopic's list.
    pub async fn create_problem(
        &self,
        subtopic_id: i64,
        title: &str,
        canonical_url: &str,
        difficulty: Difficulty,
    ) -> Result<Problem, AppError> {
        if self.get_subtopic(subtopic_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Subtopic {} not found",
                subtopic_id
            )));
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"INSERT INTO problems (subtopic_id, title, canonical_url, difficulty, sort_order, created_at)
               SELECT ?, ?, ?, ?, COALESCE(MAX(sort_order), 0) + 1, ?
               FROM problems WHERE subtopic_id = ?"#,
        )
        .bind(subtopic_id)
        .bind(title)
        .bind(canonical_url)
        .bind(difficulty.as_str())
        .bind(&now)
        .bind(subtopic_id)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_problem(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Problem {} vanished after insert", id)))
    }

    /// Flip the done flag and return the updated problem.
    pub async fn toggle_done(&self, id: i64) -> Result<Problem, AppError> {
        let result = sqlx::query("UPDATE problems SET is_done = 1 - is_done WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Problem {} not found", id)));
        }
        self.require_problem(id).await
    }

    /// Flip the bookmark flag and return the updated problem.
    pub async fn toggle_bookmark(&self, id: i64) -> Result<Problem, AppError> {
        let result =
            sqlx::query("UPDATE problems SET is_bookmarked = 1 - is_bookmarked WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Problem {} not found", id)));
        }
        self.require_problem(id).await
    }

    /// Store a code snippet; the language is kept when not supplied.
    pub async fn update_code(
        &self,
        id: i64,
        code_solution: &str,
        code_language: Option<&str>,
    ) -> Result<Problem, AppError> {
        let result = sqlx::query(
            r#"UPDATE problems
               SET code_solution = ?, code_language = COALESCE(?, code_language)
               WHERE id = ?"#,
        )
        .bind(code_solution)
        .bind(code_language)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Problem {} not found", id)));
        }
        self.require_problem(id).await
    }

    /// Delete a problem.
    pub async fn delete_problem(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM problems WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Problem {} not found", id)));
        }
        Ok(())
    }

    /// All bookmarked problems with their owner names, newest first.
    pub async fn list_bookmarks(&self) -> Result<Vec<BookmarkedProblem>, AppError> {
        let rows = sqlx::query(
            r#"SELECT p.id, p.subtopic_id, p.title, p.canonical_url, p.difficulty, p.is_done,
                      p.is_bookmarked, p.code_solution, p.code_language, p.sort_order,
                      p.created_at, s.name AS subtopic_name, t.name AS topic_name
               FROM problems p
               JOIN subtopics s ON p.subtopic_id = s.id
               JOIN topics t ON s.topic_id = t.id
               WHERE p.is_bookmarked = 1
               ORDER BY p.created_at DESC, p.id DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| BookmarkedProblem {
                problem: problem_from_row(row),
                subtopic_name: row.get("subtopic_name"),
                topic_name: row.get("topic_name"),
            })
            .collect())
    }

    async fn require_problem(&self, id: i64) -> Result<Problem, AppError> {
        self.get_problem(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// Helper functions for row conversion

fn topic_from_row(row: &sqlx::sqlite::SqliteRow) -> Topic {
    Topic {
        id: row.get("id"),
        name: row.get("name"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    }
}

fn subtopic_from_row(row: &sqlx::sqlite::SqliteRow) -> Subtopic {
    Subtopic {
        id: row.get("id"),
        topic_id: row.get("topic_id"),
        name: row.get("name"),
        description: row.get("description"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    }
}

fn problem_from_row(row: &sqlx::sqlite::SqliteRow) -> Problem {
    let difficulty: String = row.get("difficulty");
    let is_done: i64 = row.get("is_done");
    let is_bookmarked: i64 = row.get("is_bookmarked");

    Problem {
        id: row.get("id"),
        subtopic_id: row.get("subtopic_id"),
        title: row.get("title"),
        canonical_url: row.get("canonical_url"),
        difficulty: Difficulty::parse(&difficulty).unwrap_or_default(),
        is_done: is_done != 0,
        is_bookmarked: is_bookmarked != 0,
        code_solution: row.get("code_solution"),
        code_language: row.get("code_language"),
        sort_order: row.get("sort_order"),
        created_at: row.get("created_at"),
    }
}
