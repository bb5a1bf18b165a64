#![allow(clippy::cast_sign_loss)]

use super::{PreassignedRecord, ResponseRecord, Roster, WorkshopRecord};
use crate::report::Report;
use eyre::{Result, WrapErr, bail, ensure};
use sqlx::any::{AnyConnectOptions, AnyRow};
use sqlx::{AnyConnection, Connection, Row};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{info, trace};

/// Loads the roster from a database and saves the schedule into it.
///
/// Expected tables are `workshops(id, name, capacity, location)`,
/// `students(id, first_name, last_name, grade)`,
/// `preferences(student_id, workshop_id, preference_rank)`,
/// `preassignments(student_id, workshop_id, session)` and
/// `schedule(student_id, session, workshop_id)`. Sessions are numbered
/// from 1.
pub struct SqlLoader {
    conn: AnyConnection,
}

struct Student {
    id: i64,
    first_name: String,
    last_name: String,
    grade: Option<String>,
}

impl SqlLoader {
    pub async fn new(url: &str) -> Result<SqlLoader> {
        sqlx::any::install_default_drivers();
        let options = AnyConnectOptions::from_str(url)
            .wrap_err_with(|| format!("invalid database url {url}"))?;
        Ok(SqlLoader {
            conn: AnyConnection::connect_with(&options)
                .await
                .wrap_err("cannot connect to database")?,
        })
    }

    pub async fn load(&mut self) -> Result<Roster> {
        let workshops = self
            .load_workshops()
            .await
            .wrap_err("cannot load workshops")?;
        let students = self
            .load_students()
            .await
            .wrap_err("cannot load students")?;
        let mut preferences = self
            .load_preferences()
            .await
            .wrap_err("cannot load preferences")?;
        let preassignments = self
            .load_preassignments()
            .await
            .wrap_err("cannot load pre-assignments")?;
        preferences.sort_by_key(|&(student, _, rank)| (student, rank));

        let mut imposed: BTreeMap<i64, Vec<Option<i64>>> = BTreeMap::new();
        for (student, workshop, session) in preassignments {
            ensure!(
                session >= 1,
                "invalid session {session} for pre-assigned student {student}"
            );
            let sessions = imposed.entry(student).or_default();
            let slot = session as usize - 1;
            if sessions.len() <= slot {
                sessions.resize(slot + 1, None);
            }
            sessions[slot] = Some(workshop);
        }

        let mut roster = Roster {
            workshops,
            ..Roster::default()
        };
        for student in students {
            if let Some(sessions) = imposed.remove(&student.id) {
                trace!(student = student.id, ?sessions, "Pre-assigned student");
                roster.preassigned.push(PreassignedRecord {
                    source_id: student.id,
                    first_name: student.first_name,
                    last_name: student.last_name,
                    grade: student.grade,
                    sessions,
                });
            } else {
                roster.responses.push(ResponseRecord {
                    source_id: student.id,
                    first_name: student.first_name,
                    last_name: student.last_name,
                    grade: student.grade,
                    preferences: preferences
                        .iter()
                        .filter(|&&(s, _, _)| s == student.id)
                        .map(|&(_, w, _)| w)
                        .collect(),
                });
            }
        }
        if let Some(&student) = imposed.keys().next() {
            bail!("pre-assignment refers to unknown student {student}");
        }
        info!(
            workshops = roster.workshops.len(),
            responses = roster.responses.len(),
            preassigned = roster.preassigned.len(),
            "Loaded database"
        );
        Ok(roster)
    }

    async fn load_workshops(&mut self) -> Result<Vec<WorkshopRecord>> {
        Ok(
            sqlx::query("SELECT id, name, capacity, location FROM workshops ORDER BY id")
                .try_map(|row: AnyRow| {
                    Ok(WorkshopRecord {
                        source_id: i64::from(row.try_get::<i32, _>("id")?),
                        name: row.try_get("name")?,
                        capacity: row.try_get::<i32, _>("capacity")?.max(0) as u32,
                        location: row.try_get("location")?,
                    })
                })
                .fetch_all(&mut self.conn)
                .await?,
        )
    }

    async fn load_students(&mut self) -> Result<Vec<Student>> {
        Ok(
            sqlx::query("SELECT id, first_name, last_name, grade FROM students ORDER BY id")
                .try_map(|row: AnyRow| {
                    Ok(Student {
                        id: i64::from(row.try_get::<i32, _>("id")?),
                        first_name: row.try_get("first_name")?,
                        last_name: row.try_get("last_name")?,
                        grade: row.try_get("grade")?,
                    })
                })
                .fetch_all(&mut self.conn)
                .await?,
        )
    }

    async fn load_preferences(&mut self) -> Result<Vec<(i64, i64, i32)>> {
        Ok(
            sqlx::query("SELECT student_id, workshop_id, preference_rank FROM preferences")
                .try_map(|row: AnyRow| {
                    Ok((
                        i64::from(row.try_get::<i32, _>("student_id")?),
                        i64::from(row.try_get::<i32, _>("workshop_id")?),
                        row.try_get::<i32, _>("preference_rank")?,
                    ))
                })
                .fetch_all(&mut self.conn)
                .await?,
        )
    }

    async fn load_preassignments(&mut self) -> Result<Vec<(i64, i64, i32)>> {
        Ok(
            sqlx::query("SELECT student_id, workshop_id, session FROM preassignments")
                .try_map(|row: AnyRow| {
                    Ok((
                        i64::from(row.try_get::<i32, _>("student_id")?),
                        i64::from(row.try_get::<i32, _>("workshop_id")?),
                        row.try_get::<i32, _>("session")?,
                    ))
                })
                .fetch_all(&mut self.conn)
                .await?,
        )
    }

    /// Replace the content of the `schedule` table in a single transaction.
    pub async fn save(&mut self, report: &Report) -> Result<()> {
        let mut trans = self.conn.begin().await?;
        sqlx::query("DELETE FROM schedule")
            .execute(&mut *trans)
            .await
            .wrap_err("cannot clear previous schedule")?;
        let mut rows = 0;
        for entry in &report.schedule {
            for (slot, workshop) in entry.slots.iter().enumerate() {
                let Some(workshop) = workshop else {
                    continue;
                };
                sqlx::query("INSERT INTO schedule (student_id, session, workshop_id) VALUES (?, ?, ?)")
                    .bind(entry.student_source)
                    .bind(slot as i64 + 1)
                    .bind(workshop.workshop_source)
                    .execute(&mut *trans)
                    .await
                    .wrap_err("cannot save schedule")?;
                rows += 1;
            }
        }
        trans
            .commit()
            .await
            .wrap_err("error when committing transaction")?;
        info!(rows, "Schedule saved");
        Ok(())
    }
}
