use crate::matcher::Matcher;
use crate::remap::Remapping;

/// Workshop attended at one time slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotEntry {
    pub workshop_source: i64,
    pub number: u32,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub student_source: i64,
    pub first_name: String,
    pub last_name: String,
    pub grade: Option<String>,
    pub preassigned: bool,
    pub slots: Vec<Option<SlotEntry>>,
}

/// Attendance of a workshop, as `(filled, capacity)` for every session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FillEntry {
    pub number: u32,
    pub name: String,
    pub minimum: u32,
    pub sessions: Vec<(u32, u32)>,
}

/// Outcome of a successful matching run, in terms of the source records.
#[derive(Clone, Debug)]
pub struct Report {
    pub sessions: usize,
    pub schedule: Vec<ScheduleEntry>,
    pub fill: Vec<FillEntry>,
    pub score: u32,
    pub unsatisfied: Vec<String>,
}

impl Report {
    pub fn new<R>(m: &Matcher<R>, remapping: &Remapping) -> Report {
        let schedule = m
            .students()
            .iter()
            .map(|s| ScheduleEntry {
                student_source: remapping.student_source(s.id),
                first_name: s.first_name.clone(),
                last_name: s.last_name.clone(),
                grade: s.grade.clone(),
                preassigned: s.is_preassigned(),
                slots: s
                    .assigned()
                    .iter()
                    .map(|slot| {
                        slot.map(|w| {
                            let workshop = m.workshop(w);
                            SlotEntry {
                                workshop_source: remapping.workshop_source(w),
                                number: workshop.number,
                                name: workshop.name.clone(),
                                location: workshop.location.clone(),
                            }
                        })
                    })
                    .collect(),
            })
            .collect();
        let fill = m
            .workshops()
            .iter()
            .map(|w| FillEntry {
                number: w.number,
                name: w.name.clone(),
                minimum: w.minimum_fill(),
                sessions: w
                    .sessions()
                    .iter()
                    .map(|s| (s.slots_filled(), s.capacity()))
                    .collect(),
            })
            .collect();
        Report {
            sessions: m.config().sessions_per_workshop,
            schedule,
            fill,
            score: m.score(),
            unsatisfied: m
                .unsatisfied_students()
                .into_iter()
                .map(|s| m.student(s).full_name())
                .collect(),
        }
    }
}
