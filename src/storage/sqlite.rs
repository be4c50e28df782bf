use rusqlite::{params, Connection, OptionalExtension};
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use crate::algorithm::ProgramFulfillments;
use crate::error::{EngineError, EngineResult};
use crate::models::{Course, Fulfillment, Plan, PlanProgram, PlannedCourse, Program, ProgramKind};
use crate::storage::{sort_attachments, PlanStore};

/// SQLite-backed store. Program requirement documents and course attributes
/// are kept as JSON text columns.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteStore(..)")
    }
}

/// Resolve a `sqlite://` or `file://` URL (or a plain path) to a local path.
pub fn db_path_from_url(url: &str) -> EngineResult<PathBuf> {
    let url = url.trim();
    if let Some(path) = url.strip_prefix("sqlite://") {
        Ok(PathBuf::from(path))
    } else if let Some(path) = url.strip_prefix("file://") {
        Ok(PathBuf::from(path))
    } else if url.contains("://") {
        Err(EngineError::Storage(format!("unsupported database url scheme: {}", url)))
    } else {
        Ok(PathBuf::from(url))
    }
}

impl SqliteStore {
    /// Open (or create) the database file and ensure tables exist.
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened sqlite store");
        Self::with_connection(conn)
    }

    pub fn open_url(url: &str) -> EngineResult<Self> {
        Self::open(&db_path_from_url(url)?)
    }

    pub fn in_memory() -> EngineResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> EngineResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                course_id TEXT PRIMARY KEY,
                subject_code TEXT NOT NULL,
                course_number TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                credits REAL NOT NULL DEFAULT 0,
                attributes_json TEXT NOT NULL DEFAULT '{}',
                requirements_json TEXT NOT NULL DEFAULT 'null'
            );

            CREATE TABLE IF NOT EXISTS programs (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT '',
                kind TEXT NOT NULL DEFAULT 'other',
                requirements_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS plans (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS planned_courses (
                id TEXT PRIMARY KEY,
                plan_id TEXT NOT NULL,
                course_id TEXT NOT NULL,
                semester_number INTEGER NOT NULL,
                credits REAL NOT NULL
            );

            CREATE TABLE IF NOT EXISTS plan_programs (
                id TEXT PRIMARY KEY,
                plan_id TEXT NOT NULL,
                program_id TEXT NOT NULL,
                position INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS fulfillments (
                plan_program_id TEXT NOT NULL,
                planned_course_id TEXT NOT NULL,
                requirement_id TEXT NOT NULL,
                credits_applied REAL NOT NULL,
                seq INTEGER NOT NULL,
                assigned_at TEXT NOT NULL,
                PRIMARY KEY (plan_program_id, planned_course_id, requirement_id)
            );

            CREATE INDEX IF NOT EXISTS idx_planned_courses_plan ON planned_courses(plan_id);
            CREATE INDEX IF NOT EXISTS idx_plan_programs_plan ON plan_programs(plan_id);
            "#,
        )?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> EngineResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| EngineError::Storage("sqlite connection mutex poisoned".to_string()))
    }
}

fn kind_to_str(kind: ProgramKind) -> &'static str {
    match kind {
        ProgramKind::Major => "major",
        ProgramKind::Minor => "minor",
        ProgramKind::Core => "core",
        ProgramKind::Other => "other",
    }
}

fn kind_from_str(s: &str) -> ProgramKind {
    match s {
        "major" => ProgramKind::Major,
        "minor" => ProgramKind::Minor,
        "core" => ProgramKind::Core,
        _ => ProgramKind::Other,
    }
}

impl PlanStore for SqliteStore {
    fn plan(&self, plan_id: &str) -> EngineResult<Option<Plan>> {
        let conn = self.lock()?;
        let plan = conn
            .query_row("SELECT id, name FROM plans WHERE id = ?1", params![plan_id], |row| {
                Ok(Plan { id: row.get(0)?, name: row.get(1)? })
            })
            .optional()?;
        Ok(plan)
    }

    fn planned_courses(&self, plan_id: &str) -> EngineResult<Vec<PlannedCourse>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, plan_id, course_id, semester_number, credits FROM planned_courses WHERE plan_id = ?1",
        )?;
        let rows = stmt.query_map(params![plan_id], |row| {
            Ok(PlannedCourse {
                id: row.get(0)?,
                plan_id: row.get(1)?,
                course_id: row.get(2)?,
                semester_number: row.get(3)?,
                credits: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn plan_programs(&self, plan_id: &str) -> EngineResult<Vec<PlanProgram>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, plan_id, program_id, position FROM plan_programs WHERE plan_id = ?1",
        )?;
        let rows = stmt.query_map(params![plan_id], |row| {
            Ok(PlanProgram {
                id: row.get(0)?,
                plan_id: row.get(1)?,
                program_id: row.get(2)?,
                position: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        sort_attachments(&mut out);
        Ok(out)
    }

    fn plan_program(&self, plan_program_id: &str) -> EngineResult<Option<PlanProgram>> {
        let conn = self.lock()?;
        let pp = conn
            .query_row(
                "SELECT id, plan_id, program_id, position FROM plan_programs WHERE id = ?1",
                params![plan_program_id],
                |row| {
                    Ok(PlanProgram {
                        id: row.get(0)?,
                        plan_id: row.get(1)?,
                        program_id: row.get(2)?,
                        position: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(pp)
    }

    fn program(&self, program_id: &str) -> EngineResult<Option<Program>> {
        let conn = self.lock()?;
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT id, name, kind, requirements_json FROM programs WHERE id = ?1",
                params![program_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        let Some((id, name, kind, requirements_json)) = row else { return Ok(None) };
        let requirements = serde_json::from_str(&requirements_json)
            .map_err(|e| EngineError::integrity(&id, format!("stored requirements are invalid: {}", e)))?;
        Ok(Some(Program { id, name, kind: kind_from_str(&kind), requirements }))
    }

    fn courses(&self, course_ids: &[String]) -> EngineResult<HashMap<String, Course>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT course_id, subject_code, course_number, title, credits, attributes_json, requirements_json
             FROM courses WHERE course_id = ?1",
        )?;
        let mut out = HashMap::new();
        for id in course_ids {
            let row: Option<(String, String, String, String, f64, String, String)> = stmt
                .query_row(params![id.trim()], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?))
                })
                .optional()?;
            if let Some((course_id, subject_code, course_number, title, credits, attributes_json, requirements_json)) = row {
                let course = Course {
                    course_id: course_id.clone(),
                    subject_code,
                    course_number,
                    title,
                    credits,
                    attributes: serde_json::from_str(&attributes_json)?,
                    requirements: serde_json::from_str(&requirements_json)?,
                };
                out.insert(course_id, course);
            }
        }
        Ok(out)
    }

    fn fulfillments(&self, plan_program_id: &str) -> EngineResult<Vec<Fulfillment>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT planned_course_id, requirement_id, credits_applied FROM fulfillments
             WHERE plan_program_id = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![plan_program_id], |row| {
            Ok(Fulfillment {
                planned_course_id: row.get(0)?,
                requirement_id: row.get(1)?,
                credits_applied: row.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn replace_fulfillments(&self, plan_id: &str, sets: &[ProgramFulfillments]) -> EngineResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for set in sets {
            let owner: Option<String> = tx
                .query_row(
                    "SELECT plan_id FROM plan_programs WHERE id = ?1",
                    params![set.plan_program_id],
                    |row| row.get(0),
                )
                .optional()?;
            if owner.as_deref() != Some(plan_id) {
                // el rollback ocurre al soltar `tx`
                return Err(EngineError::not_found("plan program", set.plan_program_id.clone()));
            }
        }
        tx.execute(
            "DELETE FROM fulfillments WHERE plan_program_id IN (SELECT id FROM plan_programs WHERE plan_id = ?1)",
            params![plan_id],
        )?;
        let assigned_at = Utc::now().to_rfc3339();
        {
            let mut insert = tx.prepare(
                "INSERT OR REPLACE INTO fulfillments
                 (plan_program_id, planned_course_id, requirement_id, credits_applied, seq, assigned_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for set in sets {
                for (seq, f) in set.fulfillments.iter().enumerate() {
                    insert.execute(params![
                        set.plan_program_id,
                        f.planned_course_id,
                        f.requirement_id,
                        f.credits_applied,
                        seq as i64,
                        assigned_at,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn put_course(&self, course: Course) -> EngineResult<()> {
        let attributes_json = serde_json::to_string(&course.attributes)?;
        let requirements_json = serde_json::to_string(&course.requirements)?;
        self.lock()?.execute(
            "INSERT OR REPLACE INTO courses
             (course_id, subject_code, course_number, title, credits, attributes_json, requirements_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                course.course_id.trim(),
                course.subject_code,
                course.course_number,
                course.title,
                course.credits,
                attributes_json,
                requirements_json,
            ],
        )?;
        Ok(())
    }

    fn put_program(&self, program: Program) -> EngineResult<()> {
        let requirements_json = serde_json::to_string(&program.requirements)?;
        self.lock()?.execute(
            "INSERT OR REPLACE INTO programs (id, name, kind, requirements_json) VALUES (?1, ?2, ?3, ?4)",
            params![program.id, program.name, kind_to_str(program.kind), requirements_json],
        )?;
        Ok(())
    }

    fn put_plan(&self, plan: Plan) -> EngineResult<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO plans (id, name) VALUES (?1, ?2)",
            params![plan.id, plan.name],
        )?;
        Ok(())
    }

    fn put_planned_course(&self, planned: PlannedCourse) -> EngineResult<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO planned_courses (id, plan_id, course_id, semester_number, credits)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![planned.id, planned.plan_id, planned.course_id, planned.semester_number, planned.credits],
        )?;
        Ok(())
    }

    fn put_plan_program(&self, plan_program: PlanProgram) -> EngineResult<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO plan_programs (id, plan_id, program_id, position) VALUES (?1, ?2, ?3, ?4)",
            params![plan_program.id, plan_program.plan_id, plan_program.program_id, plan_program.position],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_from_url_schemes() {
        assert_eq!(db_path_from_url("sqlite://data/plans.db").unwrap(), PathBuf::from("data/plans.db"));
        assert_eq!(db_path_from_url("file:///tmp/plans.db").unwrap(), PathBuf::from("/tmp/plans.db"));
        assert_eq!(db_path_from_url("plans.db").unwrap(), PathBuf::from("plans.db"));
        assert!(db_path_from_url("postgres://localhost/plans").is_err());
    }

    #[test]
    fn test_program_kind_round_trips_through_text() {
        for kind in [ProgramKind::Major, ProgramKind::Minor, ProgramKind::Core, ProgramKind::Other] {
            assert_eq!(kind_from_str(kind_to_str(kind)), kind);
        }
    }
}
