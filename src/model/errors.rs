use thiserror::Error;

/// Failures raised while assigning students to workshop sessions. Every one
/// of them aborts the matching run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("session {} of workshop #{workshop} is full ({capacity} students)", .session + 1)]
    CapacityExceeded {
        workshop: u32,
        session: usize,
        capacity: u32,
    },

    #[error("workshop #{workshop} is full ({capacity} students over all sessions)")]
    WorkshopFull { workshop: u32, capacity: u32 },

    #[error("session {} does not exist, there are {sessions} sessions", .session + 1)]
    NoSuchSession { session: usize, sessions: usize },

    #[error("{student} is already assigned to workshop #{workshop}")]
    DuplicateAssignment { student: String, workshop: u32 },

    #[error("{student} is already assigned to all {sessions} sessions")]
    AlreadyFull { student: String, sessions: usize },

    #[error("no session of workshop #{workshop} fits the free time slots of {student}")]
    NoCompatibleSlot { student: String, workshop: u32 },

    #[error(
        "workshop #{workshop} cannot reach its minimum of {minimum} students ({filled} assigned)"
    )]
    QuorumUnreachable {
        workshop: u32,
        filled: u32,
        minimum: u32,
    },

    #[error("no remaining preference of {student} can compensate a filler assignment")]
    CompensationFailed { student: String },

    #[error("{student} could only be assigned to {assigned} out of {sessions} sessions")]
    UnassignableStudent {
        student: String,
        assigned: usize,
        sessions: usize,
    },

    #[error("{student} references unknown workshop #{number}")]
    UnknownWorkshop { student: String, number: u32 },

    #[error("insufficient number of seats, can host {seats} assignments out of {needed}")]
    InsufficientSeats { seats: u32, needed: u32 },
}
