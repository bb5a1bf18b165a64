use crate::matcher::Matcher;
use eyre::{Result, bail, ensure};
use tracing::warn;

/// Warn about workshops whose sessions are unevenly filled or individually
/// below their share of the minimum attendance.
pub fn check_session_balance<R>(m: &Matcher<R>) {
    for w in m.workshops() {
        let filled = || w.sessions().iter().map(|s| s.slots_filled());
        let min = filled().min().unwrap_or(0);
        let max = filled().max().unwrap_or(0);
        if max > min + 1 {
            warn!(workshop = %w, min, max, "Sessions are unevenly filled");
        }
        for s in w.sessions().iter().filter(|s| !s.has_reached_quorum()) {
            warn!(
                workshop = %w,
                session = s.slot() + 1,
                filled = s.slots_filled(),
                minimum = s.minimum_fill(),
                "Session below minimum attendance"
            );
        }
    }
}

/// Verify that the schedule held by the students and the attendance held
/// by the workshops agree, and that the final state is acceptable.
pub fn ensure_consistent<R>(m: &Matcher<R>) -> Result<()> {
    for w in m.workshops() {
        for s in w.sessions() {
            ensure!(
                s.slots_filled() <= s.capacity(),
                "session {} of workshop {w} has {} students for {} seats",
                s.slot() + 1,
                s.slots_filled(),
                s.capacity()
            );
            for &student in s.students() {
                if m.student(student).assigned()[s.slot()] != Some(w.id) {
                    bail!(
                        "{} is listed in session {} of workshop {w} without being assigned to it",
                        m.student(student),
                        s.slot() + 1
                    );
                }
            }
        }
        let attendees = m.students_for(w.id).len() as u32;
        ensure!(
            attendees == w.slots_filled(),
            "workshop {w} has {} students in its sessions but {attendees} students assigned",
            w.slots_filled()
        );
        ensure!(
            w.has_reached_quorum(),
            "workshop {w} has {} students out of a minimum of {}",
            w.slots_filled(),
            w.minimum_fill()
        );
    }
    for s in m.students() {
        let mut assigned = s.assigned().iter().flatten().collect::<Vec<_>>();
        let n = assigned.len();
        assigned.sort();
        assigned.dedup();
        ensure!(assigned.len() == n, "{s} attends the same workshop twice");
        ensure!(
            s.is_preassigned() || s.fully_assigned(),
            "{s} has {} workshops out of {}",
            s.number_assigned(),
            s.assigned().len()
        );
    }
    Ok(())
}
