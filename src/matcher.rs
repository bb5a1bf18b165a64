use crate::config::{MatcherConfig, PaddingPolicy, SlotPolicy};
use crate::model::{MatchError, Student, StudentId, Workshop, WorkshopId};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::{debug, info, instrument, trace, warn};

/// Assignment engine for one matching run.
///
/// Workshops and students are registered first, then [`Matcher::run`]
/// goes through the stages in order: popularity sort, preference padding,
/// quorum filling (with a random fallback), final matches and scoring.
/// A matcher must not be run twice, as popularity and preferences would
/// be counted again.
pub struct Matcher<R> {
    config: MatcherConfig,
    workshops: Vec<Workshop>,
    students: Vec<Student>,
    by_number: HashMap<u32, WorkshopId>,
    by_popularity: Vec<WorkshopId>,
    score: u32,
    rng: R,
}

impl<R> Matcher<R> {
    pub fn new(config: MatcherConfig, rng: R) -> Matcher<R> {
        Matcher {
            config,
            workshops: Vec::new(),
            students: Vec::new(),
            by_number: HashMap::new(),
            by_popularity: Vec::new(),
            score: 0,
            rng,
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn workshops(&self) -> &[Workshop] {
        &self.workshops
    }

    pub fn workshop(&self, WorkshopId(workshop): WorkshopId) -> &Workshop {
        &self.workshops[workshop]
    }

    pub fn workshop_by_number(&self, number: u32) -> Option<&Workshop> {
        self.by_number.get(&number).map(|&w| self.workshop(w))
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn student(&self, StudentId(student): StudentId) -> &Student {
        &self.students[student]
    }

    /// Workshops from the least to the most popular one.
    pub fn workshops_by_popularity(&self) -> &[WorkshopId] {
        &self.by_popularity
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Students attending `workshop`, derived from the students' schedules.
    pub fn students_for(&self, workshop: WorkshopId) -> Vec<StudentId> {
        self.students
            .iter()
            .filter(|s| s.is_assigned(workshop))
            .map(|s| s.id)
            .collect()
    }

    /// Longest preference list, which bounds the ranks to explore.
    pub fn max_rank(&self) -> usize {
        self.students
            .iter()
            .map(|s| s.preferences().len())
            .max()
            .unwrap_or(0)
    }

    /// Check that the remaining seats can host every assignment still to
    /// be made.
    pub fn check_number_of_seats(&self) -> Result<(), MatchError> {
        let seats = self.workshops.iter().map(Workshop::remaining_capacity).sum::<u32>();
        let needed = self
            .students
            .iter()
            .filter(|s| !s.is_preassigned())
            .map(|s| s.free_slots() as u32)
            .sum::<u32>();
        if seats < needed {
            return Err(MatchError::InsufficientSeats { seats, needed });
        }
        Ok(())
    }

    /// Students who got none of their preferences.
    pub fn unsatisfied_students(&self) -> Vec<StudentId> {
        let worst = self.config.worst_score();
        self.students
            .iter()
            .filter(|s| {
                !s.is_preassigned()
                    && s.score_for(&self.config.scorer_points, self.config.unpreferred_score)
                        == worst
            })
            .map(|s| s.id)
            .collect()
    }
}

impl<R: Rng> Matcher<R> {
    /// Register a new workshop. Workshops are numbered from 1 in
    /// registration order.
    pub fn add_workshop(&mut self, name: &str, capacity: u32, location: Option<&str>) -> WorkshopId {
        let id = WorkshopId(self.workshops.len());
        let number = self.workshops.len() as u32 + 1;
        let workshop = Workshop::new(
            id,
            number,
            name.to_owned(),
            location.map(str::to_owned),
            capacity,
            self.config.sessions_per_workshop,
            self.config.minimum_workshop_fill,
        );
        trace!(workshop = %workshop, capacity, "Registering workshop");
        self.by_number.insert(number, id);
        self.workshops.push(workshop);
        self.by_popularity.push(id);
        id
    }

    fn resolve(&self, student: &str, number: u32) -> Result<WorkshopId, MatchError> {
        self.by_number
            .get(&number)
            .copied()
            .ok_or_else(|| MatchError::UnknownWorkshop {
                student: student.to_owned(),
                number,
            })
    }

    /// Register a student with their preferences given as workshop numbers,
    /// most preferred first. Repeated workshops only count once.
    pub fn add_student(
        &mut self,
        first_name: &str,
        last_name: &str,
        grade: Option<&str>,
        preferences: &[u32],
    ) -> Result<StudentId, MatchError> {
        let name = format!("{first_name} {last_name}");
        let mut resolved: Vec<WorkshopId> = Vec::with_capacity(preferences.len());
        for &number in preferences {
            let workshop = self.resolve(&name, number)?;
            if resolved.contains(&workshop) {
                debug!(student = %name, workshop = number, "Ignoring repeated preference");
            } else {
                resolved.push(workshop);
            }
        }
        let id = StudentId(self.students.len());
        let student = Student::new(
            id,
            first_name.to_owned(),
            last_name.to_owned(),
            grade.map(str::to_owned),
            resolved,
            self.config.sessions_per_workshop,
        );
        if student.is_lazy() {
            warn!(student = %student, "Student did not express any preference");
        }
        student.update_popularities(&mut self.workshops, &self.config.popularity_points);
        self.students.push(student);
        Ok(id)
    }

    /// Register a student whose schedule is imposed: `sessions` holds the
    /// workshop number attended at each time slot, if any.
    pub fn add_preassigned_student(
        &mut self,
        first_name: &str,
        last_name: &str,
        grade: Option<&str>,
        sessions: &[Option<u32>],
    ) -> Result<StudentId, MatchError> {
        let id = StudentId(self.students.len());
        let mut student = Student::preassigned(
            id,
            first_name.to_owned(),
            last_name.to_owned(),
            grade.map(str::to_owned),
            self.config.sessions_per_workshop,
        );
        let name = student.full_name();
        let resolved = sessions
            .iter()
            .map(|number| number.map(|n| self.resolve(&name, n)).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        for (slot, workshop) in resolved.into_iter().enumerate() {
            let Some(workshop) = workshop else {
                continue;
            };
            if let Err(e) = student.assign_to_slot(&mut self.workshops[workshop.0], slot) {
                let assigned = student.assigned().iter().flatten().copied().collect::<Vec<_>>();
                for w in assigned {
                    student.unassign_workshop(&mut self.workshops[w.0]);
                }
                return Err(e);
            }
        }
        trace!(student = %student, "Registering pre-assigned student");
        self.students.push(student);
        Ok(id)
    }

    /// Sort workshops from the least to the most popular one. Ties keep
    /// the registration order.
    pub fn sort_by_popularity(&mut self) {
        let workshops = &self.workshops;
        self.by_popularity
            .sort_by_key(|&w| (workshops[w.0].popularity(), w));
    }

    /// Complete the preference list of every student which has less than
    /// the required number of preferences.
    #[instrument(skip_all)]
    pub fn fix_preferences(&mut self) {
        let required = self.config.required_preferences;
        for s in 0..self.students.len() {
            if self.students[s].is_preassigned() || self.students[s].has_all_preferences(required) {
                continue;
            }
            match self.config.padding {
                PaddingPolicy::LeastPopular => {
                    self.sort_by_popularity();
                    let candidates = self
                        .by_popularity
                        .iter()
                        .copied()
                        .filter(|&w| self.students[s].rank_of(w).is_none())
                        .collect::<Vec<_>>();
                    let student = &mut self.students[s];
                    for w in candidates {
                        if student.has_all_preferences(required) {
                            break;
                        }
                        let workshop = &mut self.workshops[w.0];
                        student.append_preference(workshop, &self.config.popularity_points);
                        debug!(student = %student, workshop = %workshop, "Added workshop to preferences");
                    }
                    if !student.has_all_preferences(required) {
                        warn!(
                            student = %student,
                            preferences = student.preferences().len(),
                            required,
                            "Not enough workshops to complete preferences"
                        );
                    }
                }
                PaddingPolicy::Placeholder => {
                    let student = &mut self.students[s];
                    while !student.has_all_preferences(required) {
                        student.append_placeholder();
                    }
                    debug!(student = %student, "Padded preferences with placeholders");
                }
            }
        }
        self.sort_by_popularity();
    }

    fn assign(&mut self, student: StudentId, workshop: WorkshopId) -> Result<usize, MatchError> {
        let slot = self.students[student.0].assign_workshop(
            &mut self.workshops[workshop.0],
            &mut self.rng,
            self.config.slot_selection,
        )?;
        trace!(
            student = %self.students[student.0],
            workshop = %self.workshops[workshop.0],
            session = slot + 1,
            "Assigned student",
        );
        Ok(slot)
    }

    /// Bring every workshop to its minimum attendance, starting with the
    /// least popular ones.
    #[instrument(skip_all)]
    pub fn reach_minimum_for_all(&mut self) -> Result<(), MatchError> {
        for w in self.by_popularity.clone() {
            self.reach_minimum(w)?;
        }
        info!("Every workshop reached its minimum attendance");
        Ok(())
    }

    /// Fill `workshop` up to its minimum with the students who ranked it,
    /// best ranks first, then with random students if needed.
    pub fn reach_minimum(&mut self, workshop: WorkshopId) -> Result<(), MatchError> {
        for rank in 0..self.max_rank() {
            for s in 0..self.students.len() {
                if self.workshops[workshop.0].has_reached_quorum() {
                    return Ok(());
                }
                let student = &self.students[s];
                if student.is_preassigned()
                    || student.fully_assigned()
                    || student.is_assigned(workshop)
                    || student.preference_at(rank) != Some(workshop)
                {
                    continue;
                }
                match self.assign(StudentId(s), workshop) {
                    Ok(_) => {}
                    Err(MatchError::NoCompatibleSlot { .. }) => {
                        debug!(
                            student = %self.students[s],
                            workshop = %self.workshops[workshop.0],
                            "No compatible session when reaching minimum",
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        if self.workshops[workshop.0].has_reached_quorum() {
            Ok(())
        } else {
            self.fill_with_random_students(workshop)
        }
    }

    /// True if the preference of `student` at `rank` can still be given
    /// to them alongside an assignment to `filler`.
    fn is_open_preference(&self, student: StudentId, filler: WorkshopId, rank: usize) -> bool {
        let student = &self.students[student.0];
        student.preference_at(rank).is_some_and(|p| {
            p != filler && !student.is_assigned(p) && !self.workshops[p.0].is_full()
        })
    }

    /// Assign random students to `filler` until it reaches its minimum.
    /// Every drawn student gets `filler`, plus their preference at the
    /// current rank when it is still open, and is not drawn again.
    #[instrument(skip_all, fields(workshop = %self.workshops[filler.0]))]
    fn fill_with_random_students(&mut self, filler: WorkshopId) -> Result<(), MatchError> {
        let room = self.config.sessions_per_workshop.min(2);
        let mut candidates = self
            .students
            .iter()
            .filter(|s| !s.is_preassigned() && !s.is_assigned(filler) && s.free_slots() >= room)
            .map(|s| s.id)
            .collect::<Vec<_>>();
        info!(
            filled = self.workshops[filler.0].slots_filled(),
            minimum = self.workshops[filler.0].minimum_fill(),
            candidates = candidates.len(),
            "Filling workshop with random students",
        );
        for rank in 0..self.max_rank().max(1) {
            candidates.shuffle(&mut self.rng);
            while let Some(student) = candidates.pop() {
                if self.workshops[filler.0].has_reached_quorum() {
                    return Ok(());
                }
                self.assign_filler(student, filler, rank)?;
            }
        }
        let workshop = &self.workshops[filler.0];
        if workshop.has_reached_quorum() {
            Ok(())
        } else {
            Err(MatchError::QuorumUnreachable {
                workshop: workshop.number,
                filled: workshop.slots_filled(),
                minimum: workshop.minimum_fill(),
            })
        }
    }

    /// Assign `student` to `filler`, then to their preference at `rank` if
    /// it is still open. Either assignment may fail for lack of a
    /// compatible session, which leaves the student as is.
    fn assign_filler(
        &mut self,
        student: StudentId,
        filler: WorkshopId,
        rank: usize,
    ) -> Result<(), MatchError> {
        match self.assign(student, filler) {
            Ok(_) => {}
            Err(MatchError::NoCompatibleSlot { .. }) => {
                debug!(student = %self.students[student.0], "No compatible session for filler");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        let Some(preference) = self.students[student.0].preference_at(rank) else {
            return Ok(());
        };
        if self.students[student.0].fully_assigned()
            || !self.is_open_preference(student, filler, rank)
        {
            debug!(
                student = %self.students[student.0],
                filler = %self.workshops[filler.0],
                "Filler assignment without compensation",
            );
            return Ok(());
        }
        match self.assign(student, preference) {
            Ok(_) => {
                debug!(
                    student = %self.students[student.0],
                    filler = %self.workshops[filler.0],
                    compensation = %self.workshops[preference.0],
                    "Compensated filler assignment",
                );
                Ok(())
            }
            Err(MatchError::NoCompatibleSlot { .. }) => {
                debug!(
                    student = %self.students[student.0],
                    compensation = %self.workshops[preference.0],
                    "No compatible session for compensation",
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Give every student their best remaining preferences until their
    /// schedule is complete.
    #[instrument(skip_all)]
    pub fn final_matches(&mut self) -> Result<(), MatchError> {
        for s in 0..self.students.len() {
            if self.students[s].is_preassigned() {
                continue;
            }
            while !self.students[s].fully_assigned() {
                match self.students[s].compensate(
                    &mut self.workshops,
                    &mut self.rng,
                    self.config.slot_selection,
                ) {
                    Ok(workshop) => trace!(
                        student = %self.students[s],
                        workshop = %self.workshops[workshop.0],
                        "Assigned preference",
                    ),
                    Err(MatchError::CompensationFailed { .. }) => {
                        let student = &self.students[s];
                        return Err(MatchError::UnassignableStudent {
                            student: student.full_name(),
                            assigned: student.number_assigned(),
                            sessions: self.config.sessions_per_workshop,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Move students between the sessions of a workshop until session fills
    /// differ by at most one, as far as the students' other workshops allow.
    /// Each workshop is visited once.
    #[instrument(skip_all)]
    pub fn balance_sessions(&mut self) {
        for w in 0..self.workshops.len() {
            while let Some((from, to)) = self.unbalanced_sessions(WorkshopId(w)) {
                if !self.move_one_student(WorkshopId(w), from, to) {
                    debug!(workshop = %self.workshops[w], "Cannot balance sessions");
                    break;
                }
            }
        }
    }

    /// Most and least filled sessions of `workshop`, if they differ by more
    /// than one student.
    fn unbalanced_sessions(&self, workshop: WorkshopId) -> Option<(usize, usize)> {
        let sessions = self.workshops[workshop.0].sessions();
        let fullest = sessions.iter().max_by_key(|s| s.slots_filled())?;
        let emptiest = sessions.iter().min_by_key(|s| s.slots_filled())?;
        (fullest.slots_filled() > emptiest.slots_filled() + 1)
            .then(|| (fullest.slot(), emptiest.slot()))
    }

    fn move_one_student(&mut self, workshop: WorkshopId, from: usize, to: usize) -> bool {
        let attendees = self.workshops[workshop.0].sessions()[from].students().to_vec();
        for s in attendees {
            if self.students[s.0].is_preassigned() {
                continue;
            }
            match self.students[s.0].swap_sessions(from, to, &mut self.workshops) {
                Ok(()) => {
                    trace!(
                        student = %self.students[s.0],
                        workshop = %self.workshops[workshop.0],
                        from = from + 1,
                        to = to + 1,
                        "Moved student to another session",
                    );
                    return true;
                }
                Err(e) => trace!(student = %self.students[s.0], error = %e, "Cannot move student"),
            }
        }
        false
    }

    /// Compute the overall score of the matches (lower is better).
    pub fn score_matches(&mut self) -> u32 {
        let (points, unpreferred) = (&self.config.scorer_points, self.config.unpreferred_score);
        self.score = self
            .students
            .iter_mut()
            .filter(|s| !s.is_preassigned())
            .map(|s| s.calculate_score(points, unpreferred))
            .sum();
        info!(score = self.score, "Matches scored");
        self.score
    }

    /// Run every stage of the matching and return the overall score.
    #[instrument(skip_all)]
    pub fn run(&mut self) -> Result<u32, MatchError> {
        info!(
            workshops = self.workshops.len(),
            students = self.students.len(),
            "Starting matching",
        );
        self.check_number_of_seats()?;
        self.sort_by_popularity();
        self.fix_preferences();
        self.reach_minimum_for_all()?;
        self.final_matches()?;
        if self.config.slot_selection == SlotPolicy::LeastFull {
            self.balance_sessions();
        }
        let score = self.score_matches();
        let unsatisfied = self.unsatisfied_students();
        if unsatisfied.is_empty() {
            info!("Every student got at least one preference");
        } else {
            for &s in &unsatisfied {
                warn!(student = %self.student(s), "Student got none of their preferences");
            }
            warn!(
                students = unsatisfied.len(),
                "Some students did not get any of their preferences"
            );
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(sessions: usize, required: usize) -> MatcherConfig {
        MatcherConfig {
            sessions_per_workshop: sessions,
            required_preferences: required,
            ..MatcherConfig::default()
        }
    }

    fn matcher(config: MatcherConfig) -> Matcher<StdRng> {
        Matcher::new(config, StdRng::seed_from_u64(2024))
    }

    fn assert_invariants(m: &Matcher<StdRng>) {
        for w in m.workshops() {
            assert!(w.slots_filled() <= w.total_base_capacity(), "{w} over capacity");
            for s in w.sessions() {
                assert!(s.slots_filled() <= s.capacity());
                for &student in s.students() {
                    assert_eq!(m.student(student).assigned()[s.slot()], Some(w.id));
                }
            }
            assert_eq!(m.students_for(w.id).len() as u32, w.slots_filled());
        }
        for s in m.students() {
            assert!(s.number_assigned() <= m.config().sessions_per_workshop);
            let mut assigned = s.assigned().iter().flatten().collect::<Vec<_>>();
            let n = assigned.len();
            assigned.sort();
            assigned.dedup();
            assert_eq!(assigned.len(), n, "{s} has a duplicate assignment");
        }
    }

    #[test]
    fn test_registration() {
        let mut m = matcher(config(3, 6));
        let a = m.add_workshop("Astronomy", 10, Some("Room 1"));
        let b = m.add_workshop("Biology", 10, None);
        assert_eq!(m.workshop(a).number, 1);
        assert_eq!(m.workshop_by_number(2).unwrap().id, b);
        assert!(m.workshop_by_number(3).is_none());
        let s = m.add_student("Ada", "Lovelace", Some("7"), &[2, 1, 2]).unwrap();
        assert_eq!(m.student(s).preferences(), &[Some(b), Some(a)]);
        assert_eq!(m.workshop(b).popularity(), 1);
        assert_eq!(m.workshop(a).popularity(), 1);
        assert_eq!(
            m.add_student("Alan", "Turing", None, &[1, 4]),
            Err(MatchError::UnknownWorkshop {
                student: "Alan Turing".into(),
                number: 4
            })
        );
        assert_eq!(m.students().len(), 1);
    }

    #[test]
    fn test_sort_by_popularity_is_stable() {
        let mut m = matcher(config(1, 1));
        let a = m.add_workshop("A", 5, None);
        let b = m.add_workshop("B", 5, None);
        let c = m.add_workshop("C", 5, None);
        let d = m.add_workshop("D", 5, None);
        m.add_student("S", "1", None, &[2]).unwrap();
        m.add_student("S", "2", None, &[4]).unwrap();
        m.add_student("S", "3", None, &[4]).unwrap();
        m.sort_by_popularity();
        assert_eq!(m.workshops_by_popularity(), &[a, c, b, d]);
    }

    // 1 workshop, 10 seats, 10 students who all want it.
    #[test]
    fn test_single_full_workshop() {
        let mut m = matcher(config(1, 1));
        let w = m.add_workshop("Robotics", 10, None);
        for i in 0..10 {
            m.add_student("Student", &i.to_string(), None, &[1]).unwrap();
        }
        assert_eq!(m.workshop(w).minimum_fill(), 7);
        let score = m.run().unwrap();
        assert!(m.workshop(w).is_full());
        assert!(m.workshop(w).has_reached_quorum());
        assert!(m.students().iter().all(Student::fully_assigned));
        assert_eq!(score, 10 * m.config().scorer_points[0]);
        assert!(m.unsatisfied_students().is_empty());
        assert_invariants(&m);
    }

    // A workshop that nobody listed gets exactly its minimum through the
    // random fallback, and every drafted student gets a preference as well.
    #[test]
    fn test_fallback_fill() {
        let mut m = matcher(MatcherConfig {
            scorer_points: vec![1, 3],
            popularity_points: vec![1, 1],
            ..config(2, 2)
        });
        let filler = m.add_workshop("Knitting", 5, None);
        let a = m.add_workshop("Astronomy", 8, None);
        let b = m.add_workshop("Biology", 8, None);
        for i in 0..20 {
            m.add_student("Student", &i.to_string(), None, &[2, 3]).unwrap();
        }
        m.sort_by_popularity();
        m.fix_preferences();
        assert_eq!(m.workshops_by_popularity()[0], filler);
        assert_eq!(m.workshop(filler).minimum_fill(), 7);
        m.reach_minimum(filler).unwrap();
        assert_eq!(m.workshop(filler).slots_filled(), 7);
        let drafted = m.students_for(filler);
        assert_eq!(drafted.len(), 7);
        for s in drafted {
            let student = m.student(s);
            assert!(student.fully_assigned());
            assert!(student.is_assigned(a), "{student} was not compensated");
        }
        assert_eq!(m.workshop(a).slots_filled(), 7);
        assert_eq!(m.workshop(b).slots_filled(), 0);
        assert_invariants(&m);
    }

    #[test]
    fn test_fallback_is_reproducible() {
        let drafted = |seed| {
            let mut m = Matcher::new(
                MatcherConfig {
                    scorer_points: vec![1, 3],
                    popularity_points: vec![1, 1],
                    ..config(2, 2)
                },
                StdRng::seed_from_u64(seed),
            );
            let filler = m.add_workshop("Knitting", 5, None);
            m.add_workshop("Astronomy", 8, None);
            m.add_workshop("Biology", 8, None);
            for i in 0..20 {
                m.add_student("Student", &i.to_string(), None, &[2, 3]).unwrap();
            }
            m.sort_by_popularity();
            m.reach_minimum(filler).unwrap();
            m.students_for(filler)
        };
        assert_eq!(drafted(17), drafted(17));
    }

    // Drafted students whose preference is already full still count
    // towards the minimum of the filler workshop.
    #[test]
    fn test_fallback_with_full_preferences() {
        let mut m = matcher(MatcherConfig {
            scorer_points: vec![1],
            popularity_points: vec![1],
            ..config(3, 1)
        });
        let filler = m.add_workshop("Knitting", 3, None);
        let a = m.add_workshop("Astronomy", 1, None);
        for i in 0..6 {
            m.add_student("Student", &i.to_string(), None, &[2]).unwrap();
        }
        m.sort_by_popularity();
        assert_eq!(m.workshop(filler).minimum_fill(), 6);
        m.reach_minimum(a).unwrap();
        m.reach_minimum(filler).unwrap();
        assert_eq!(m.workshop(filler).slots_filled(), 6);
        assert_eq!(m.workshop(a).slots_filled(), 3);
        let drafted = m.students_for(filler);
        assert_eq!(drafted.len(), 6);
        assert_eq!(
            drafted.iter().filter(|&&s| !m.student(s).is_assigned(a)).count(),
            3
        );
        for s in m.students_for(a) {
            assert!(m.student(s).is_assigned(filler));
        }
        assert_invariants(&m);
    }

    #[test]
    fn test_quorum_unreachable() {
        let mut m = matcher(MatcherConfig {
            scorer_points: vec![1],
            popularity_points: vec![1],
            ..config(2, 1)
        });
        let filler = m.add_workshop("Knitting", 10, None);
        m.add_workshop("Astronomy", 10, None);
        for i in 0..5 {
            m.add_student("Student", &i.to_string(), None, &[2]).unwrap();
        }
        m.sort_by_popularity();
        assert_eq!(
            m.reach_minimum(filler),
            Err(MatchError::QuorumUnreachable {
                workshop: 1,
                filled: 5,
                minimum: 14
            })
        );
    }

    // Two listed preferences out of six get completed with the least
    // popular workshops, in ascending popularity.
    #[test]
    fn test_fix_preferences_least_popular() {
        let mut m = matcher(MatcherConfig {
            popularity_points: vec![6, 5, 4, 3, 2, 1],
            ..config(3, 6)
        });
        let ws = (1..=8)
            .map(|i| m.add_workshop(&format!("W{i}"), 10, None))
            .collect::<Vec<_>>();
        let s = m.add_student("Short", "List", None, &[1, 2]).unwrap();
        m.add_student("Long", "List", None, &[8, 7, 6, 5, 4, 3]).unwrap();
        m.sort_by_popularity();
        m.fix_preferences();
        let expected = [0, 1, 2, 3, 4, 5].map(|i| Some(ws[i]));
        assert_eq!(m.student(s).preferences(), &expected);
        assert_eq!(m.workshop(ws[2]).popularity(), 1 + 4);
        assert_eq!(m.workshop(ws[5]).popularity(), 4 + 1);

        // Padding again leaves complete lists untouched.
        m.fix_preferences();
        assert_eq!(m.student(s).preferences(), &expected);
        assert!(m.students().iter().all(|s| s.preferences().len() == 6));
    }

    #[test]
    fn test_fix_preferences_placeholder() {
        let mut m = matcher(MatcherConfig {
            padding: PaddingPolicy::Placeholder,
            ..config(3, 4)
        });
        let a = m.add_workshop("A", 10, None);
        m.add_workshop("B", 10, None);
        let s = m.add_student("Short", "List", None, &[1]).unwrap();
        m.fix_preferences();
        m.fix_preferences();
        assert_eq!(m.student(s).preferences(), &[Some(a), None, None, None]);
        assert_eq!(m.max_rank(), 4);
    }

    #[test]
    fn test_fix_preferences_with_few_workshops() {
        let mut m = matcher(config(1, 6));
        m.add_workshop("A", 10, None);
        m.add_workshop("B", 10, None);
        let s = m.add_student("Short", "List", None, &[2]).unwrap();
        m.fix_preferences();
        assert_eq!(m.student(s).preferences().len(), 2);
    }

    // Every preference of the second student is full by the final stage.
    #[test]
    fn test_unassignable_student() {
        let mut m = matcher(MatcherConfig {
            scorer_points: vec![1],
            popularity_points: vec![1],
            ..config(1, 1)
        });
        m.add_workshop("Popular", 1, None);
        m.add_workshop("Spare", 1, None);
        let first = m.add_student("First", "Student", None, &[1]).unwrap();
        let second = m.add_student("Second", "Student", None, &[1]).unwrap();
        m.add_student("Third", "Student", None, &[2]).unwrap();
        assert_eq!(
            m.run(),
            Err(MatchError::UnassignableStudent {
                student: "Second Student".into(),
                assigned: 0,
                sessions: 1
            })
        );
        assert!(m.student(first).fully_assigned());
        assert_eq!(m.student(second).number_assigned(), 0);
        assert_invariants(&m);
    }

    #[test]
    fn test_insufficient_seats() {
        let mut m = matcher(config(3, 1));
        m.add_workshop("Tiny", 1, None);
        m.add_student("A", "B", None, &[1]).unwrap();
        m.add_student("C", "D", None, &[1]).unwrap();
        assert_eq!(
            m.run(),
            Err(MatchError::InsufficientSeats { seats: 3, needed: 6 })
        );
    }

    #[test]
    fn test_full_run_single_session() {
        let mut m = matcher(MatcherConfig {
            minimum_workshop_fill: 0.5,
            scorer_points: vec![1, 3],
            popularity_points: vec![1, 1],
            ..config(1, 2)
        });
        let a = m.add_workshop("A", 10, None);
        let b = m.add_workshop("B", 10, None);
        let c = m.add_workshop("C", 4, None);
        for i in 0..12 {
            m.add_student("AB", &i.to_string(), None, &[1, 2]).unwrap();
        }
        for i in 0..4 {
            m.add_student("BA", &i.to_string(), None, &[2, 1]).unwrap();
        }
        m.run().unwrap();
        assert_invariants(&m);
        assert!(m.students().iter().all(Student::fully_assigned));
        assert!(m.workshops().iter().all(Workshop::has_reached_quorum));
        assert_eq!(m.workshop(c).slots_filled(), 2);
        assert!(m.workshop(a).slots_filled() >= 5);
        assert!(m.workshop(b).slots_filled() >= 5);
        assert_eq!(m.workshop(a).slots_filled() + m.workshop(b).slots_filled(), 14);
        let unsatisfied = m.unsatisfied_students();
        assert_eq!(unsatisfied.len(), 2);
        assert!(unsatisfied.iter().all(|&s| m.student(s).is_assigned(c)));
        let expected = m
            .students()
            .iter()
            .map(|s| s.score().unwrap())
            .sum::<u32>();
        assert_eq!(m.score(), expected);
    }

    #[test]
    fn test_preassigned_students() {
        let mut m = matcher(MatcherConfig {
            minimum_workshop_fill: 0.5,
            scorer_points: vec![1, 3],
            popularity_points: vec![1, 1],
            ..config(2, 2)
        });
        let a = m.add_workshop("A", 4, None);
        let b = m.add_workshop("B", 4, None);
        let p = m
            .add_preassigned_student("Pre", "Assigned", None, &[Some(2), None])
            .unwrap();
        assert_eq!(m.student(p).assigned(), &[Some(b), None]);
        assert_eq!(m.workshop(b).session(0).unwrap().slots_filled(), 1);
        for i in 0..5 {
            m.add_student("S", &i.to_string(), None, &[1, 2]).unwrap();
        }
        m.run().unwrap();
        assert_invariants(&m);
        assert_eq!(m.student(p).number_assigned(), 1);
        assert!(m.student(p).score().is_none());
        assert!(
            m.students()
                .iter()
                .filter(|s| !s.is_preassigned())
                .all(|s| s.is_assigned(a) && s.is_assigned(b))
        );
        assert_eq!(m.score(), 5 * (1 + 3));
    }

    #[test]
    fn test_preassigned_rollback() {
        let mut m = matcher(config(2, 2));
        let a = m.add_workshop("A", 1, None);
        m.add_preassigned_student("First", "Pre", None, &[None, Some(1)])
            .unwrap();
        assert!(matches!(
            m.add_preassigned_student("Second", "Pre", None, &[Some(1), Some(1)]),
            Err(MatchError::DuplicateAssignment { workshop: 1, .. })
        ));
        assert_eq!(m.workshop(a).slots_filled(), 1);
        assert_eq!(m.students().len(), 1);
    }

    #[test]
    fn test_preassigned_unknown_workshop() {
        let mut m = matcher(config(2, 2));
        m.add_workshop("A", 4, None);
        assert!(matches!(
            m.add_preassigned_student("Pre", "Assigned", None, &[Some(3)]),
            Err(MatchError::UnknownWorkshop { number: 3, .. })
        ));
    }

    #[test]
    fn test_preference_order_slots() {
        let mut m = matcher(MatcherConfig {
            minimum_workshop_fill: 0.5,
            slot_selection: SlotPolicy::PreferenceOrder,
            scorer_points: vec![1, 3],
            popularity_points: vec![1, 1],
            ..config(2, 2)
        });
        m.add_workshop("A", 4, None);
        m.add_workshop("B", 4, None);
        for i in 0..4 {
            m.add_student("S", &i.to_string(), None, &[1, 2]).unwrap();
        }
        m.run().unwrap();
        assert_invariants(&m);
        assert!(m.students().iter().all(Student::fully_assigned));
    }

    #[test]
    fn test_balance_sessions() {
        let mut m = matcher(MatcherConfig {
            slot_selection: SlotPolicy::PreferenceOrder,
            scorer_points: vec![1, 3],
            popularity_points: vec![1, 1],
            ..config(2, 2)
        });
        let a = m.add_workshop("A", 4, None);
        let b = m.add_workshop("B", 4, None);
        for i in 0..4 {
            m.add_student("S", &i.to_string(), None, &[1, 2]).unwrap();
        }
        let fills = |m: &Matcher<StdRng>, w: WorkshopId| {
            m.workshop(w)
                .sessions()
                .iter()
                .map(|s| s.slots_filled())
                .collect::<Vec<_>>()
        };
        m.final_matches().unwrap();
        assert_eq!(fills(&m, a), vec![4, 0]);
        assert_eq!(fills(&m, b), vec![0, 4]);
        m.balance_sessions();
        assert_eq!(fills(&m, a), vec![2, 2]);
        assert_eq!(fills(&m, b), vec![2, 2]);
        for s in m.students() {
            assert!(s.is_assigned(a) && s.is_assigned(b));
        }
        assert_invariants(&m);
    }
}
