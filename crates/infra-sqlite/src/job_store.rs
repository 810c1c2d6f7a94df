// SQLite JobStore Implementation

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::warn;
use uws_core::domain::{
    ErrorCode, ErrorType, Job, JobDescription, JobError, JobId, JobParameter, JobResult, Phase,
};
use uws_core::error::{AppError, Result};
use uws_core::port::job_store::{Availability, ListFilter};
use uws_core::port::{JobStore, TimeProvider};

fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                AppError::Store(format!("database error [{}]: {}", code, db_err.message()))
            } else {
                AppError::Store(format!("database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Store("row not found".to_string()),
        other => AppError::Store(other.to_string()),
    }
}

/// True for the SQLite-BUSY/locked conditions a single retry can clear (I4).
fn is_retryable(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.code().as_deref() == Some("5") || db_err.code().as_deref() == Some("6")
    )
}

pub struct SqliteJobStore {
    pool: SqlitePool,
    time: Arc<dyn TimeProvider>,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool, time: Arc<dyn TimeProvider>) -> Self {
        Self { pool, time }
    }

    /// Guarded phase transition, retried once on a lock conflict before
    /// surfacing the error (spec §4.1 I4). A guard miss (0 rows affected on
    /// an existing job) is not an error: it means a terminal write already
    /// landed, and that write must stand.
    async fn guarded_transition(
        &self,
        job_id: JobId,
        allowed: &[&str],
        set_clause: &str,
        binds: Vec<SqlBind>,
    ) -> Result<()> {
        for attempt in 0..2 {
            let placeholders = allowed.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!(
                "UPDATE job SET {set_clause} WHERE id = ? AND phase IN ({placeholders})"
            );
            let mut query = sqlx::query(&sql);
            for bind in &binds {
                query = bind.apply(query);
            }
            query = query.bind(job_id);
            for phase in allowed {
                query = query.bind(*phase);
            }

            match query.execute(&self.pool).await {
                Ok(result) => {
                    if result.rows_affected() == 0 {
                        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM job WHERE id = ?")
                            .bind(job_id)
                            .fetch_optional(&self.pool)
                            .await
                            .map_err(map_sqlx_error)?;
                        if exists.is_none() {
                            return Err(AppError::UnknownJob(job_id));
                        }
                        warn!(job_id, "guarded transition dropped: job already in terminal phase");
                    }
                    return Ok(());
                }
                Err(e) if is_retryable(&e) && attempt == 0 => continue,
                Err(e) => return Err(map_sqlx_error(e)),
            }
        }
        unreachable!("loop always returns or errors within two attempts")
    }
}

enum SqlBind {
    Str(String),
    I64(i64),
}

impl SqlBind {
    fn apply<'q>(
        &'q self,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        match self {
            SqlBind::Str(s) => query.bind(s),
            SqlBind::I64(n) => query.bind(n),
        }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn add(
        &self,
        owner: &str,
        run_id: Option<String>,
        parameters: Vec<JobParameter>,
        execution_duration: i64,
        lifetime_secs: i64,
    ) -> Result<Job> {
        let now = self.time.now_millis();
        let destruction_time = now + lifetime_secs * 1000;

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(
            r#"
            INSERT INTO job (owner, phase, run_id, creation_time, destruction_time, execution_duration)
            VALUES (?, 'PENDING', ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(&run_id)
        .bind(now)
        .bind(destruction_time)
        .bind(execution_duration)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let job_id: i64 = row.get("id");

        for (index, param) in parameters.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO job_parameter (job_id, insertion_index, parameter_id, value, is_post)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(job_id)
            .bind(index as i64)
            .bind(&param.id)
            .bind(&param.value)
            .bind(param.is_post as i32)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Job::new(job_id, owner, run_id, parameters, now, lifetime_secs, execution_duration))
    }

    async fn get(&self, job_id: JobId) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM job WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or(AppError::UnknownJob(job_id))?;

        let parameters: Vec<JobParameter> = sqlx::query_as::<_, ParamRow>(
            "SELECT parameter_id, value, is_post FROM job_parameter WHERE job_id = ? ORDER BY insertion_index",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(ParamRow::into_parameter)
        .collect();

        let results: Vec<JobResult> = sqlx::query_as::<_, ResultRow>(
            "SELECT result_id, url, size, mime_type FROM job_result WHERE job_id = ? ORDER BY sequence",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(ResultRow::into_result)
        .collect();

        Ok(row.into_job(parameters, results))
    }

    async fn list(&self, filter: ListFilter) -> Result<Vec<JobDescription>> {
        let mut sql = String::from(
            "SELECT id, owner, phase, run_id, creation_time FROM job WHERE owner = ?",
        );
        if filter.phases.is_some() {
            sql.push_str(" AND phase IN (SELECT value FROM json_each(?))");
        }
        if filter.after.is_some() {
            sql.push_str(" AND creation_time > ?");
        }
        sql.push_str(" ORDER BY creation_time DESC");
        if filter.count.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query_as::<_, DescriptionRow>(&sql).bind(&filter.owner);
        if let Some(phases) = &filter.phases {
            let json = serde_json::to_string(&phases.iter().map(|p| p.to_string()).collect::<Vec<_>>())
                .map_err(AppError::from)?;
            query = query.bind(json);
        }
        if let Some(after) = filter.after {
            query = query.bind(after);
        }
        if let Some(count) = filter.count {
            query = query.bind(count as i64);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(DescriptionRow::into_description).collect())
    }

    async fn delete(&self, job_id: JobId) -> Result<()> {
        let result = sqlx::query("DELETE FROM job WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(AppError::UnknownJob(job_id));
        }
        Ok(())
    }

    async fn mark_queued(&self, job_id: JobId, message_id: String) -> Result<()> {
        self.guarded_transition(
            job_id,
            &["PENDING", "HELD"],
            "phase = 'QUEUED', message_id = ?",
            vec![SqlBind::Str(message_id)],
        )
        .await
    }

    async fn mark_executing(&self, job_id: JobId, start_time: i64) -> Result<()> {
        // start_time is unconditional (spec §4.1); only the phase transition
        // is guarded, so a job_started delivered after a terminal write still
        // records when the job actually started (S7).
        sqlx::query("UPDATE job SET start_time = ? WHERE id = ?")
            .bind(start_time)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        self.guarded_transition(job_id, &["PENDING", "QUEUED"], "phase = 'EXECUTING'", vec![])
            .await
    }

    async fn mark_completed(&self, job_id: JobId, results: Vec<JobResult>) -> Result<()> {
        let now = self.time.now_millis();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            UPDATE job
            SET phase = 'COMPLETED', end_time = ?,
                error_type = NULL, error_code = NULL, error_message = NULL, error_detail = NULL
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(job_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM job_result WHERE job_id = ?")
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        for (sequence, result) in results.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO job_result (job_id, sequence, result_id, url, size, mime_type)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(job_id)
            .bind(sequence as i64)
            .bind(&result.result_id)
            .bind(&result.url)
            .bind(result.size)
            .bind(&result.mime_type)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn mark_failed(&self, job_id: JobId, error: JobError) -> Result<()> {
        let now = self.time.now_millis();
        let error_type = match error.error_type {
            ErrorType::Transient => "transient",
            ErrorType::Fatal => "fatal",
        };
        sqlx::query(
            r#"
            UPDATE job
            SET phase = 'ERROR', end_time = ?,
                error_type = ?, error_code = ?, error_message = ?, error_detail = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(error_type)
        .bind(error.error_code.to_string())
        .bind(&error.message)
        .bind(&error.detail)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_destruction(&self, job_id: JobId, destruction_time: i64) -> Result<()> {
        sqlx::query("UPDATE job SET destruction_time = ? WHERE id = ?")
            .bind(destruction_time)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_execution_duration(&self, job_id: JobId, execution_duration: i64) -> Result<()> {
        sqlx::query("UPDATE job SET execution_duration = ? WHERE id = ?")
            .bind(execution_duration)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn expire_jobs(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM job WHERE destruction_time <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn availability(&self) -> Availability {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => Availability { available: true, note: None },
            Err(e) => Availability { available: false, note: Some(e.to_string()) },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: i64,
    message_id: Option<String>,
    owner: String,
    phase: String,
    run_id: Option<String>,
    creation_time: i64,
    start_time: Option<i64>,
    end_time: Option<i64>,
    destruction_time: i64,
    execution_duration: i64,
    quote: Option<i64>,
    error_type: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
    error_detail: Option<String>,
}

impl JobRow {
    fn into_job(self, parameters: Vec<JobParameter>, results: Vec<JobResult>) -> Job {
        use std::str::FromStr;
        let phase = Phase::from_str(&self.phase).unwrap_or(Phase::Unknown);
        let error = self.error_message.map(|message| JobError {
            error_type: match self.error_type.as_deref() {
                Some("fatal") => ErrorType::Fatal,
                _ => ErrorType::Transient,
            },
            error_code: self
                .error_code
                .map(ErrorCode::Other)
                .unwrap_or(ErrorCode::ServiceUnavailable),
            message,
            detail: self.error_detail,
        });

        Job {
            job_id: self.id,
            owner: self.owner,
            run_id: self.run_id,
            phase,
            message_id: self.message_id,
            parameters,
            results,
            error,
            creation_time: self.creation_time,
            start_time: self.start_time,
            end_time: self.end_time,
            destruction_time: self.destruction_time,
            execution_duration: self.execution_duration,
            quote: self.quote,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ParamRow {
    parameter_id: String,
    value: String,
    is_post: i64,
}

impl ParamRow {
    fn into_parameter(self) -> JobParameter {
        JobParameter {
            id: self.parameter_id,
            value: self.value,
            is_post: self.is_post != 0,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ResultRow {
    result_id: String,
    url: String,
    size: Option<i64>,
    mime_type: Option<String>,
}

impl ResultRow {
    fn into_result(self) -> JobResult {
        JobResult {
            result_id: self.result_id,
            url: self.url,
            size: self.size,
            mime_type: self.mime_type,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DescriptionRow {
    id: i64,
    owner: String,
    phase: String,
    run_id: Option<String>,
    creation_time: i64,
}

impl DescriptionRow {
    fn into_description(self) -> JobDescription {
        use std::str::FromStr;
        JobDescription {
            job_id: self.id,
            owner: self.owner,
            phase: Phase::from_str(&self.phase).unwrap_or(Phase::Unknown),
            run_id: self.run_id,
            creation_time: self.creation_time,
        }
    }
}
