use crate::loaders::Roster;
use crate::matcher::Matcher;
use crate::model::{StudentId, WorkshopId};
use eyre::{Result, WrapErr, bail, ensure};
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Correspondence between the dense identifiers used by the matcher and
/// the identifiers of the data source.
#[derive(Clone, Debug, Default)]
pub struct Remapping {
    workshops: Vec<i64>,
    students: Vec<i64>,
}

impl Remapping {
    pub fn workshop_source(&self, WorkshopId(workshop): WorkshopId) -> i64 {
        self.workshops[workshop]
    }

    pub fn student_source(&self, StudentId(student): StudentId) -> i64 {
        self.students[student]
    }
}

/// Register the content of `roster` into an empty matcher. Workshops are
/// numbered in roster order, respondents are registered before
/// pre-assigned students.
pub fn register<R: Rng>(roster: &Roster, m: &mut Matcher<R>) -> Result<Remapping> {
    ensure!(
        m.workshops().is_empty() && m.students().is_empty(),
        "roster must be registered into an empty matcher"
    );
    let sessions = m.config().sessions_per_workshop;
    let mut remapping = Remapping::default();

    let mut numbers: HashMap<i64, u32> = HashMap::new();
    for w in &roster.workshops {
        ensure!(w.capacity > 0, "workshop {} has no capacity", w.name);
        let id = m.add_workshop(&w.name, w.capacity, w.location.as_deref());
        if numbers.insert(w.source_id, m.workshop(id).number).is_some() {
            bail!("duplicate workshop identifier {}", w.source_id);
        }
        remapping.workshops.push(w.source_id);
    }
    let number = |student: &str, source: i64| match numbers.get(&source) {
        Some(&n) => Ok(n),
        None => bail!("student {student} refers to unknown workshop {source}"),
    };

    let mut seen = HashSet::new();
    for r in &roster.responses {
        let name = format!("{} {}", r.first_name, r.last_name);
        ensure!(
            seen.insert(r.source_id),
            "duplicate student identifier {}",
            r.source_id
        );
        let preferences = r
            .preferences
            .iter()
            .map(|&p| number(&name, p))
            .collect::<Result<Vec<_>>>()?;
        m.add_student(&r.first_name, &r.last_name, r.grade.as_deref(), &preferences)
            .wrap_err_with(|| format!("cannot register student {name}"))?;
        remapping.students.push(r.source_id);
    }
    for p in &roster.preassigned {
        let name = format!("{} {}", p.first_name, p.last_name);
        ensure!(
            seen.insert(p.source_id),
            "duplicate student identifier {}",
            p.source_id
        );
        ensure!(
            p.sessions.len() <= sessions,
            "student {name} is pre-assigned to {} sessions out of {sessions}",
            p.sessions.len()
        );
        let slots = p
            .sessions
            .iter()
            .map(|s| s.map(|w| number(&name, w)).transpose())
            .collect::<Result<Vec<_>>>()?;
        m.add_preassigned_student(&p.first_name, &p.last_name, p.grade.as_deref(), &slots)
            .wrap_err_with(|| format!("cannot register pre-assigned student {name}"))?;
        remapping.students.push(p.source_id);
    }
    Ok(remapping)
}
