use super::{MatchError, Workshop, WorkshopId};
use crate::config::SlotPolicy;
use rand::Rng;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StudentId(pub usize);

#[derive(Clone, Debug)]
pub struct Student {
    pub id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub grade: Option<String>,
    /// Ranked preferences, `None` being a "no preference" placeholder.
    preferences: Vec<Option<WorkshopId>>,
    /// Assigned workshop for every time slot. This is the reference for
    /// who attends what: sessions only mirror it.
    assigned: Vec<Option<WorkshopId>>,
    preassigned: bool,
    score: Option<u32>,
}

impl Student {
    pub fn new(
        id: StudentId,
        first_name: String,
        last_name: String,
        grade: Option<String>,
        preferences: Vec<WorkshopId>,
        sessions: usize,
    ) -> Student {
        Student {
            id,
            first_name,
            last_name,
            grade,
            preferences: preferences.into_iter().map(Some).collect(),
            assigned: vec![None; sessions],
            preassigned: false,
            score: None,
        }
    }

    /// A student whose schedule is imposed and who does not take part in
    /// the matching.
    pub fn preassigned(
        id: StudentId,
        first_name: String,
        last_name: String,
        grade: Option<String>,
        sessions: usize,
    ) -> Student {
        Student {
            preassigned: true,
            ..Student::new(id, first_name, last_name, grade, Vec::new(), sessions)
        }
    }

    pub fn is_preassigned(&self) -> bool {
        self.preassigned
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn preferences(&self) -> &[Option<WorkshopId>] {
        &self.preferences
    }

    pub fn preference_at(&self, rank: usize) -> Option<WorkshopId> {
        self.preferences.get(rank).copied().flatten()
    }

    pub fn rank_of(&self, workshop: WorkshopId) -> Option<usize> {
        self.preferences.iter().position(|&p| p == Some(workshop))
    }

    /// True if the student did not express any real preference.
    pub fn is_lazy(&self) -> bool {
        self.preferences.iter().all(Option::is_none)
    }

    /// Register the weight of every listed preference in the matching
    /// workshop popularity.
    pub fn update_popularities(&self, workshops: &mut [Workshop], weights: &[u32]) {
        for (rank, preference) in self.preferences.iter().enumerate() {
            if let Some(workshop) = preference {
                workshops[workshop.0].increment_popularity(weight_at(weights, rank));
            }
        }
    }

    pub fn has_all_preferences(&self, required: usize) -> bool {
        self.preferences.len() >= required
    }

    pub fn append_preference(&mut self, workshop: &mut Workshop, weights: &[u32]) {
        workshop.increment_popularity(weight_at(weights, self.preferences.len()));
        self.preferences.push(Some(workshop.id));
    }

    pub fn append_placeholder(&mut self) {
        self.preferences.push(None);
    }

    pub fn assigned(&self) -> &[Option<WorkshopId>] {
        &self.assigned
    }

    pub fn number_assigned(&self) -> usize {
        self.assigned.iter().filter(|a| a.is_some()).count()
    }

    pub fn free_slots(&self) -> usize {
        self.assigned.len() - self.number_assigned()
    }

    pub fn fully_assigned(&self) -> bool {
        self.number_assigned() == self.assigned.len()
    }

    pub fn is_assigned(&self, workshop: WorkshopId) -> bool {
        self.assigned.contains(&Some(workshop))
    }

    fn check_assignable(&self, workshop: &Workshop) -> Result<(), MatchError> {
        if self.fully_assigned() {
            return Err(MatchError::AlreadyFull {
                student: self.full_name(),
                sessions: self.assigned.len(),
            });
        }
        if self.is_assigned(workshop.id) {
            return Err(MatchError::DuplicateAssignment {
                student: self.full_name(),
                workshop: workshop.number,
            });
        }
        if workshop.is_full() {
            return Err(MatchError::WorkshopFull {
                workshop: workshop.number,
                capacity: workshop.total_base_capacity(),
            });
        }
        Ok(())
    }

    /// Pick the session of `workshop` to attend according to `policy`.
    fn compatible_slot<R: Rng + ?Sized>(
        &self,
        workshop: &Workshop,
        rng: &mut R,
        policy: SlotPolicy,
    ) -> Option<usize> {
        let fits = |slot: usize| {
            self.assigned.get(slot) == Some(&None)
                && workshop.session(slot).is_some_and(|s| !s.is_full())
        };
        match policy {
            SlotPolicy::LeastFull => workshop
                .least_full_sessions(rng)
                .into_iter()
                .find(|&slot| fits(slot)),
            SlotPolicy::PreferenceOrder => self
                .assigned
                .iter()
                .position(Option::is_none)
                .filter(|&slot| fits(slot)),
        }
    }

    /// Assign the student to a session of `workshop`, returning the time
    /// slot used. Either both the student and the session are updated, or
    /// none of them is.
    pub fn assign_workshop<R: Rng + ?Sized>(
        &mut self,
        workshop: &mut Workshop,
        rng: &mut R,
        policy: SlotPolicy,
    ) -> Result<usize, MatchError> {
        self.check_assignable(workshop)?;
        let slot = self
            .compatible_slot(workshop, rng, policy)
            .ok_or_else(|| MatchError::NoCompatibleSlot {
                student: self.full_name(),
                workshop: workshop.number,
            })?;
        workshop.add_student(self.id, slot)?;
        self.assigned[slot] = Some(workshop.id);
        Ok(slot)
    }

    /// Assign the student to the session of `workshop` taking place at `slot`.
    pub fn assign_to_slot(&mut self, workshop: &mut Workshop, slot: usize) -> Result<(), MatchError> {
        self.check_assignable(workshop)?;
        if self.assigned.get(slot) != Some(&None) {
            return Err(MatchError::NoCompatibleSlot {
                student: self.full_name(),
                workshop: workshop.number,
            });
        }
        workshop.add_student(self.id, slot)?;
        self.assigned[slot] = Some(workshop.id);
        Ok(())
    }

    /// Withdraw the student from `workshop`, returning the freed time slot.
    pub fn unassign_workshop(&mut self, workshop: &mut Workshop) -> Option<usize> {
        let slot = self.assigned.iter().position(|&a| a == Some(workshop.id))?;
        workshop.remove_student(self.id, slot);
        self.assigned[slot] = None;
        Some(slot)
    }

    /// Exchange the workshops attended at time slots `first` and `second`.
    /// An empty slot is exchanged as well, which moves a workshop to a free
    /// time. Nothing changes if a moved workshop has no room left at its
    /// new time.
    pub fn swap_sessions(
        &mut self,
        first: usize,
        second: usize,
        workshops: &mut [Workshop],
    ) -> Result<(), MatchError> {
        let sessions = self.assigned.len();
        if let Some(&session) = [first, second].iter().find(|&&slot| slot >= sessions) {
            return Err(MatchError::NoSuchSession { session, sessions });
        }
        if first == second {
            return Ok(());
        }
        for (from, to) in [(first, second), (second, first)] {
            let Some(w) = self.assigned[from] else {
                continue;
            };
            let workshop = &workshops[w.0];
            match workshop.session(to) {
                Some(session) if session.is_full() => {
                    return Err(MatchError::CapacityExceeded {
                        workshop: workshop.number,
                        session: to,
                        capacity: session.capacity(),
                    });
                }
                Some(_) => {}
                None => {
                    return Err(MatchError::NoSuchSession {
                        session: to,
                        sessions: workshop.sessions().len(),
                    });
                }
            }
        }
        let (a, b) = (self.assigned[first], self.assigned[second]);
        if let Some(w) = a {
            workshops[w.0].remove_student(self.id, first);
        }
        if let Some(w) = b {
            workshops[w.0].remove_student(self.id, second);
        }
        if let Some(w) = a {
            workshops[w.0].add_student(self.id, second)?;
        }
        if let Some(w) = b {
            workshops[w.0].add_student(self.id, first)?;
        }
        self.assigned.swap(first, second);
        Ok(())
    }

    /// Assign the best ranked preference that still has a compatible
    /// session with room left.
    pub fn compensate<R: Rng + ?Sized>(
        &mut self,
        workshops: &mut [Workshop],
        rng: &mut R,
        policy: SlotPolicy,
    ) -> Result<WorkshopId, MatchError> {
        if self.fully_assigned() {
            return Err(MatchError::AlreadyFull {
                student: self.full_name(),
                sessions: self.assigned.len(),
            });
        }
        for preference in self.preferences.clone().into_iter().flatten() {
            let workshop = &mut workshops[preference.0];
            if self.is_assigned(preference) || workshop.is_full() {
                continue;
            }
            match self.assign_workshop(workshop, rng, policy) {
                Ok(_) => return Ok(preference),
                Err(MatchError::NoCompatibleSlot { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(MatchError::CompensationFailed {
            student: self.full_name(),
        })
    }

    /// Score of the current assignments (lower is better). Unassigned
    /// slots do not count.
    pub fn score_for(&self, scorer_points: &[u32], unpreferred_score: u32) -> u32 {
        self.assigned
            .iter()
            .flatten()
            .map(|&workshop| {
                self.rank_of(workshop)
                    .and_then(|rank| scorer_points.get(rank).copied())
                    .unwrap_or(unpreferred_score)
            })
            .sum()
    }

    pub fn calculate_score(&mut self, scorer_points: &[u32], unpreferred_score: u32) -> u32 {
        let score = self.score_for(scorer_points, unpreferred_score);
        self.score = Some(score);
        score
    }

    pub fn score(&self) -> Option<u32> {
        self.score
    }
}

fn weight_at(weights: &[u32], rank: usize) -> u32 {
    weights.get(rank).copied().unwrap_or(0)
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}
