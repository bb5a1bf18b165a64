pub use self::errors::MatchError;
pub use self::session::Session;
pub use self::student::{Student, StudentId};
pub use self::workshop::{Workshop, WorkshopId};

mod errors;
mod session;
mod student;
mod workshop;
