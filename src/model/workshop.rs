use super::{MatchError, Session, StudentId, session};
use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct WorkshopId(pub usize);

#[derive(Clone, Debug)]
pub struct Workshop {
    pub id: WorkshopId,
    pub number: u32,
    pub name: String,
    pub location: Option<String>,
    sessions: Vec<Session>,
    popularity: u32,
    minimum_fill: u32,
}

impl Workshop {
    /// Build a workshop offering `sessions` sessions of `capacity` seats each.
    pub fn new(
        id: WorkshopId,
        number: u32,
        name: String,
        location: Option<String>,
        capacity: u32,
        sessions: usize,
        fill_ratio: f64,
    ) -> Workshop {
        let sessions = (0..sessions)
            .map(|slot| Session::new(number, slot, capacity, fill_ratio))
            .collect::<Vec<_>>();
        let total = sessions.iter().map(Session::capacity).sum();
        Workshop {
            id,
            number,
            name,
            location,
            sessions,
            popularity: 0,
            minimum_fill: session::minimum_fill(total, fill_ratio),
        }
    }

    pub fn popularity(&self) -> u32 {
        self.popularity
    }

    pub fn increment_popularity(&mut self, points: u32) {
        self.popularity += points;
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session(&self, slot: usize) -> Option<&Session> {
        self.sessions.get(slot)
    }

    pub fn total_base_capacity(&self) -> u32 {
        self.sessions.iter().map(Session::capacity).sum()
    }

    pub fn slots_filled(&self) -> u32 {
        self.sessions.iter().map(Session::slots_filled).sum()
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.total_base_capacity() - self.slots_filled()
    }

    pub fn minimum_fill(&self) -> u32 {
        self.minimum_fill
    }

    pub fn is_full(&self) -> bool {
        self.slots_filled() >= self.total_base_capacity()
    }

    pub fn has_reached_quorum(&self) -> bool {
        self.slots_filled() >= self.minimum_fill
    }

    /// Students attending any session, in session order.
    pub fn students(&self) -> impl Iterator<Item = StudentId> + '_ {
        self.sessions.iter().flat_map(|s| s.students().iter().copied())
    }

    /// Session indices sorted from the least to the most filled one. Sessions
    /// with the same fill are returned in random order.
    pub fn least_full_sessions<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut slots = (0..self.sessions.len()).collect::<Vec<_>>();
        slots.shuffle(rng);
        slots.sort_by_key(|&slot| self.sessions[slot].slots_filled());
        slots
    }

    pub fn add_student(&mut self, student: StudentId, slot: usize) -> Result<(), MatchError> {
        if slot >= self.sessions.len() {
            return Err(MatchError::NoSuchSession {
                session: slot,
                sessions: self.sessions.len(),
            });
        }
        if self.is_full() {
            return Err(MatchError::WorkshopFull {
                workshop: self.number,
                capacity: self.total_base_capacity(),
            });
        }
        self.sessions[slot].add_student(student)
    }

    pub fn remove_student(&mut self, student: StudentId, slot: usize) -> bool {
        self.sessions
            .get_mut(slot)
            .is_some_and(|s| s.remove_student(student))
    }
}

impl fmt::Display for Workshop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn workshop(capacity: u32, sessions: usize) -> Workshop {
        Workshop::new(
            WorkshopId(0),
            1,
            "Robotics".into(),
            Some("Lab 2".into()),
            capacity,
            sessions,
            0.7,
        )
    }

    #[test]
    fn test_aggregates() {
        let mut w = workshop(4, 3);
        assert_eq!(w.total_base_capacity(), 12);
        assert_eq!(w.minimum_fill(), 8);
        w.add_student(StudentId(0), 0).unwrap();
        w.add_student(StudentId(1), 2).unwrap();
        w.add_student(StudentId(2), 2).unwrap();
        assert_eq!(w.slots_filled(), 3);
        assert_eq!(
            w.slots_filled(),
            w.sessions().iter().map(Session::slots_filled).sum::<u32>()
        );
        assert_eq!(w.remaining_capacity(), 9);
        assert_eq!(
            w.students().collect::<Vec<_>>(),
            vec![StudentId(0), StudentId(1), StudentId(2)]
        );
        assert!(w.remove_student(StudentId(1), 2));
        assert!(!w.remove_student(StudentId(1), 2));
        assert_eq!(w.slots_filled(), 2);
    }

    #[test]
    fn test_full_workshop() {
        let mut w = workshop(1, 2);
        w.add_student(StudentId(0), 0).unwrap();
        w.add_student(StudentId(1), 1).unwrap();
        assert!(w.is_full());
        assert!(w.has_reached_quorum());
        assert_eq!(
            w.add_student(StudentId(2), 0),
            Err(MatchError::WorkshopFull {
                workshop: 1,
                capacity: 2
            })
        );
    }

    #[test]
    fn test_full_session() {
        let mut w = workshop(1, 2);
        w.add_student(StudentId(0), 1).unwrap();
        assert_eq!(
            w.add_student(StudentId(1), 1),
            Err(MatchError::CapacityExceeded {
                workshop: 1,
                session: 1,
                capacity: 1
            })
        );
        assert_eq!(
            w.add_student(StudentId(1), 2),
            Err(MatchError::NoSuchSession {
                session: 2,
                sessions: 2
            })
        );
        assert_eq!(
            MatchError::NoSuchSession {
                session: 2,
                sessions: 2
            }
            .to_string(),
            "session 3 does not exist, there are 2 sessions"
        );
    }

    #[test]
    fn test_popularity() {
        let mut w = workshop(3, 3);
        w.increment_popularity(1);
        w.increment_popularity(5);
        assert_eq!(w.popularity(), 6);
    }

    #[test]
    fn test_least_full_sessions() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut w = workshop(5, 3);
        w.add_student(StudentId(0), 0).unwrap();
        w.add_student(StudentId(1), 0).unwrap();
        w.add_student(StudentId(2), 2).unwrap();
        assert_eq!(w.least_full_sessions(&mut rng), vec![1, 2, 0]);
    }

    #[test]
    fn test_least_full_sessions_breaks_ties_randomly() {
        let mut rng = StdRng::seed_from_u64(42);
        let w = workshop(5, 3);
        let mut first = [0; 3];
        for _ in 0..300 {
            let order = w.least_full_sessions(&mut rng);
            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2]);
            first[order[0]] += 1;
        }
        assert!(first.iter().all(|&n| n > 50), "biased tie breaking: {first:?}");
    }

    #[test]
    fn test_display() {
        assert_eq!(workshop(3, 3).to_string(), "Robotics (1)");
    }
}
