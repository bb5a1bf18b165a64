use super::{MatchError, StudentId};

// Absorbs representation error so that 10 × 0.7 yields 7.
const FILL_EPSILON: f64 = 1e-9;

/// Minimum number of students required for `capacity` seats to be viable.
pub fn minimum_fill(capacity: u32, fill_ratio: f64) -> u32 {
    (f64::from(capacity) * fill_ratio + FILL_EPSILON).floor() as u32
}

/// One time slot of a workshop. The session index is also the time slot
/// index in the students' schedules.
#[derive(Clone, Debug)]
pub struct Session {
    workshop: u32,
    slot: usize,
    capacity: u32,
    minimum_fill: u32,
    students: Vec<StudentId>,
}

impl Session {
    pub fn new(workshop: u32, slot: usize, capacity: u32, fill_ratio: f64) -> Session {
        Session {
            workshop,
            slot,
            capacity,
            minimum_fill: minimum_fill(capacity, fill_ratio),
            students: Vec::new(),
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn minimum_fill(&self) -> u32 {
        self.minimum_fill
    }

    pub fn slots_filled(&self) -> u32 {
        self.students.len() as u32
    }

    pub fn students(&self) -> &[StudentId] {
        &self.students
    }

    pub fn is_full(&self) -> bool {
        self.slots_filled() >= self.capacity
    }

    pub fn has_reached_quorum(&self) -> bool {
        self.slots_filled() >= self.minimum_fill
    }

    pub fn add_student(&mut self, student: StudentId) -> Result<(), MatchError> {
        if self.is_full() {
            return Err(MatchError::CapacityExceeded {
                workshop: self.workshop,
                session: self.slot,
                capacity: self.capacity,
            });
        }
        self.students.push(student);
        Ok(())
    }

    /// Remove a student from the session, returning `false` if they were
    /// not attending it.
    pub fn remove_student(&mut self, student: StudentId) -> bool {
        if let Some(pos) = self.students.iter().position(|&s| s == student) {
            self.students.remove(pos);
            true
        } else {
            false
        }
    }
}
