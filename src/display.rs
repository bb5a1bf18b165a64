use crate::matcher::Matcher;
use crate::report::Report;
use crate::stats;

pub fn display_details<R>(m: &Matcher<R>) {
    let mut workshops = m.workshops().iter().collect::<Vec<_>>();
    workshops.sort_by_key(|w| w.name.clone());
    for w in workshops {
        let mut students = w
            .sessions()
            .iter()
            .flat_map(|s| s.students().iter().map(move |&st| (st, s.slot())))
            .collect::<Vec<_>>();
        students.sort_by_key(|&(s, slot)| (slot, m.student(s).last_name.clone(), s));
        if students.is_empty() {
            continue;
        }
        match &w.location {
            Some(location) => println!("{w} [{location}]:"),
            None => println!("{w}:"),
        }
        for (s, slot) in students {
            let student = m.student(s);
            print!("  - session {}: {student}", slot + 1);
            if let Some(grade) = &student.grade {
                print!(" (grade {grade})");
            }
            if student.is_preassigned() {
                print!(" (pre-assigned)");
            } else if let Some(rank) = student.rank_of(w.id) {
                print!(" (rank {})", rank + 1);
            }
            println!();
        }
        println!();
    }
}

pub fn display_fill<R>(m: &Matcher<R>) {
    println!("Workshop attendance (filled/capacity per session, minimum):");
    for w in m.workshops() {
        let sessions = w
            .sessions()
            .iter()
            .map(|s| format!("{}/{}", s.slots_filled(), s.capacity()))
            .collect::<Vec<_>>();
        println!(
            "  - {w}: {} (total {}/{}, minimum {})",
            sessions.join(" "),
            w.slots_filled(),
            w.total_base_capacity(),
            w.minimum_fill()
        );
    }
}

pub fn display_stats<R>(m: &Matcher<R>) {
    let students = m.students().len();
    let preassigned = m.students().iter().filter(|s| s.is_preassigned()).count();
    let lazy = m
        .students()
        .iter()
        .filter(|s| !s.is_preassigned() && s.is_lazy())
        .count();
    println!(
        "Students matched/pre-assigned/without preferences/total: {}/{}/{}/{}",
        students - preassigned,
        preassigned,
        lazy,
        students
    );
    let (ranks, unpreferred) = stats::statistics(m);
    let cumul = ranks.iter().scan(0, |s, &r| {
        *s += r;
        Some(*s)
    });
    let total = ranks.iter().sum::<usize>() + unpreferred;
    println!("Final ranking:");
    for (rank, (n, c)) in ranks.iter().zip(cumul).enumerate() {
        if *n != 0 {
            println!(
                "  - rank {}: {} (cumulative {} - {:.2}%)",
                rank + 1,
                n,
                c,
                100.0 * c as f32 / total as f32
            );
        }
    }
    if unpreferred != 0 {
        println!("  - not listed: {unpreferred}");
    }
}

pub fn display_summary(report: &Report) {
    let preassigned = report.schedule.iter().filter(|e| e.preassigned).count();
    println!(
        "Score: {} ({} students scored)",
        report.score,
        report.schedule.len() - preassigned
    );
    let mut students = report.unsatisfied.clone();
    students.sort();
    if !students.is_empty() {
        println!("Students who got none of their preferences:");
        for name in students {
            println!("  - {name}");
        }
    }
}
