use crate::matcher::Matcher;

/// Number of assignments made at every preference rank, followed by the
/// number of assignments to workshops the student did not list. Trailing
/// empty ranks are dropped. Pre-assigned students are not counted.
pub fn statistics<R>(m: &Matcher<R>) -> (Vec<usize>, usize) {
    let mut ranks = vec![0; m.max_rank()];
    let mut unpreferred = 0;
    for student in m.students().iter().filter(|s| !s.is_preassigned()) {
        for &workshop in student.assigned().iter().flatten() {
            match student.rank_of(workshop) {
                Some(rank) => ranks[rank] += 1,
                None => unpreferred += 1,
            }
        }
    }
    let latest = ranks.iter().rposition(|&n| n != 0).map_or(0, |n| n + 1);
    ranks.truncate(latest);
    (ranks, unpreferred)
}
