//! The neighborhood generator: picks a move class by a violation-weighted
//! roulette, then mutates the grid in place.

use crate::evaluator::Evaluator;
use crate::problem::{CourseId, CurriculumId, PeriodId, Problem, RoomId, TeacherId};
use crate::solution::Solution;

/// `attempts` scales with temperature: more retries at low T, where the
/// search is close to converged and a wasted draw is expensive.
fn attempts_for_temperature(temperature: f64) -> u32 {
    if temperature >= 1000.0 {
        2
    } else if temperature >= 100.0 {
        3
    } else if temperature >= 10.0 {
        4
    } else if temperature >= 1.0 {
        5
    } else {
        6
    }
}

fn random_period(problem: &Problem, rng: &mut fastrand::Rng) -> PeriodId {
    PeriodId::from_index(rng.usize(0..problem.total_periods()))
}

fn random_room(problem: &Problem, rng: &mut fastrand::Rng) -> RoomId {
    RoomId::from_index(rng.usize(0..problem.num_rooms()))
}

/// Any occupied cell at `period` taught by `teacher`, if one exists.
fn find_cell_for_teacher_at(
    problem: &Problem,
    solution: &Solution,
    period: PeriodId,
    teacher: TeacherId,
) -> Option<RoomId> {
    (0..problem.num_rooms()).map(RoomId::from_index).find(|&room| {
        solution
            .get(period, room)
            .is_some_and(|course| problem.course(course).teacher_id == teacher)
    })
}

/// Any occupied cell at `period` belonging to a course in `curriculum`.
fn find_cell_for_curriculum_at(
    problem: &Problem,
    solution: &Solution,
    period: PeriodId,
    curriculum: CurriculumId,
) -> Option<RoomId> {
    (0..problem.num_rooms()).map(RoomId::from_index).find(|&room| {
        solution.get(period, room).is_some_and(|course| {
            problem.course(course).curricula.contains(&curriculum)
        })
    })
}

/// Any occupied cell belonging to `course` that is not its primary room.
fn find_unstable_cell(
    solution: &Solution,
    course: CourseId,
    primary: RoomId,
) -> Option<(PeriodId, RoomId)> {
    solution
        .occupied_cells()
        .find(|&(_, room, c)| c == course && room != primary)
        .map(|(period, room, _)| (period, room))
}

/// Any occupied cell belonging to a course taught by `teacher`.
fn find_cell_for_teacher(
    problem: &Problem,
    solution: &Solution,
    teacher: TeacherId,
) -> Option<(PeriodId, RoomId)> {
    solution
        .occupied_cells()
        .find(|&(_, _, c)| problem.course(c).teacher_id == teacher)
        .map(|(period, room, _)| (period, room))
}

/// Generic 4-step acceptance ladder shared by every targeted move. `from` is
/// the witnessed cell; the closures classify a freshly-drawn target cell
/// `(period, room)` against the violation being fixed.
#[allow(clippy::too_many_arguments)]
fn targeted_fix(
    problem: &Problem,
    solution: &mut Solution,
    from: (PeriodId, RoomId),
    attempts: u32,
    rng: &mut fastrand::Rng,
    mut resolves: impl FnMut(&Solution, PeriodId, RoomId) -> bool,
    mut beneficial_swap: impl FnMut(&Solution, PeriodId, RoomId) -> bool,
    mut same_kind_violation: impl FnMut(&Solution, PeriodId, RoomId) -> bool,
    mut weakened: impl FnMut(&Solution, PeriodId, RoomId) -> bool,
) -> bool {
    let (from_period, from_room) = from;

    for _ in 0..attempts {
        let to_period = random_period(problem, rng);
        let to_room = random_room(problem, rng);
        if (to_period, to_room) == (from_period, from_room) {
            continue;
        }

        if solution.get(to_period, to_room).is_none() {
            if resolves(solution, to_period, to_room) {
                solution.relocate(from_period, from_room, to_period, to_room);
                return true;
            }
        } else if beneficial_swap(solution, to_period, to_room)
            || same_kind_violation(solution, to_period, to_room)
        {
            solution.swap_cells(from_period, from_room, to_period, to_room);
            return true;
        }
    }

    for _ in 0..attempts {
        let to_period = random_period(problem, rng);
        let to_room = random_room(problem, rng);
        if (to_period, to_room) == (from_period, from_room) {
            continue;
        }
        if weakened(solution, to_period, to_room) {
            if solution.get(to_period, to_room).is_none() {
                solution.relocate(from_period, from_room, to_period, to_room);
            } else {
                solution.swap_cells(from_period, from_room, to_period, to_room);
            }
            return true;
        }
    }

    false
}

fn fix_teacher_conflict(
    problem: &Problem,
    solution: &mut Solution,
    evaluator: &Evaluator,
    witness: (PeriodId, TeacherId),
    attempts: u32,
    rng: &mut fastrand::Rng,
) -> bool {
    let (period, teacher) = witness;
    let Some(room) = find_cell_for_teacher_at(problem, solution, period, teacher) else {
        return false;
    };
    let course = solution.get(period, room).expect("witness cell is occupied");

    targeted_fix(
        problem,
        solution,
        (period, room),
        attempts,
        rng,
        |solution, to_period, _to_room| {
            to_period != period
                && !problem.is_unavailable(course, to_period)
                && find_cell_for_teacher_at(problem, solution, to_period, teacher).is_none()
        },
        |solution, to_period, to_room| {
            let other = solution.get(to_period, to_room).unwrap();
            to_period != period && problem.course(other).teacher_id != teacher
        },
        |solution, to_period, to_room| {
            let other = solution.get(to_period, to_room).unwrap();
            to_period != period
                && evaluator.teacher_conflict_at(to_period, problem.course(other).teacher_id)
        },
        |_solution, to_period, _to_room| to_period != period,
    )
}

fn fix_curriculum_conflict(
    problem: &Problem,
    solution: &mut Solution,
    evaluator: &Evaluator,
    witness: (PeriodId, CurriculumId),
    attempts: u32,
    rng: &mut fastrand::Rng,
) -> bool {
    let (period, curriculum) = witness;
    let Some(room) = find_cell_for_curriculum_at(problem, solution, period, curriculum) else {
        return false;
    };
    let course = solution.get(period, room).expect("witness cell is occupied");

    targeted_fix(
        problem,
        solution,
        (period, room),
        attempts,
        rng,
        |solution, to_period, _to_room| {
            to_period != period
                && !problem.is_unavailable(course, to_period)
                && find_cell_for_curriculum_at(problem, solution, to_period, curriculum).is_none()
        },
        |solution, to_period, to_room| {
            let other = solution.get(to_period, to_room).unwrap();
            to_period != period && !problem.course(other).curricula.contains(&curriculum)
        },
        |solution, to_period, to_room| {
            let other = solution.get(to_period, to_room).unwrap();
            to_period != period
                && problem
                    .course(other)
                    .curricula
                    .iter()
                    .any(|&k| evaluator.curriculum_conflict_at(to_period, k))
        },
        |_solution, to_period, _to_room| to_period != period,
    )
}

fn fix_isolation(
    problem: &Problem,
    solution: &mut Solution,
    witness: (PeriodId, RoomId, CurriculumId),
    attempts: u32,
    rng: &mut fastrand::Rng,
) -> bool {
    let (period, room, curriculum) = witness;
    if solution.get(period, room).is_none() {
        return false;
    }
    let course = solution.get(period, room).unwrap();

    let has_curriculum_neighbor = |solution: &Solution, p: PeriodId| {
        [
            p.prev_same_day(problem.periods_per_day),
            p.next_same_day(problem.periods_per_day),
        ]
        .into_iter()
        .flatten()
        .any(|neighbor| find_cell_for_curriculum_at(problem, solution, neighbor, curriculum).is_some())
    };

    targeted_fix(
        problem,
        solution,
        (period, room),
        attempts,
        rng,
        |solution, to_period, _to_room| {
            !problem.is_unavailable(course, to_period) && has_curriculum_neighbor(solution, to_period)
        },
        |solution, to_period, _to_room| has_curriculum_neighbor(solution, to_period),
        |solution, to_period, to_room| {
            solution.get(to_period, to_room).is_some_and(|other| {
                !has_curriculum_neighbor(solution, to_period) && other != course
            })
        },
        |_solution, _to_period, _to_room| true,
    )
}

fn fix_over_capacity(
    problem: &Problem,
    solution: &mut Solution,
    witness: (PeriodId, RoomId),
    attempts: u32,
    rng: &mut fastrand::Rng,
) -> bool {
    let (period, room) = witness;
    let Some(course_id) = solution.get(period, room) else {
        return false;
    };
    let course = problem.course(course_id);

    targeted_fix(
        problem,
        solution,
        (period, room),
        attempts,
        rng,
        |_solution, to_period, to_room| {
            !problem.is_unavailable(course_id, to_period)
                && problem.room_fits_capacity(course, problem.room(to_room))
        },
        |solution, to_period, to_room| {
            let other = solution.get(to_period, to_room);
            problem.room_fits_capacity(course, problem.room(to_room))
                && other.is_some_and(|o| problem.room_fits_capacity(problem.course(o), problem.room(room)))
        },
        |solution, to_period, to_room| {
            let other = solution.get(to_period, to_room).unwrap();
            !problem.room_fits_capacity(problem.course(other), problem.room(to_room))
        },
        |_solution, _to_period, to_room| problem.room(to_room).capacity > problem.room(room).capacity,
    )
}

fn fix_room_instability(
    problem: &Problem,
    solution: &mut Solution,
    evaluator: &Evaluator,
    course: CourseId,
    attempts: u32,
    rng: &mut fastrand::Rng,
) -> bool {
    let Some(primary) = evaluator.primary_room(course) else {
        return false;
    };
    let Some((period, room)) = find_unstable_cell(solution, course, primary) else {
        return false;
    };

    targeted_fix(
        problem,
        solution,
        (period, room),
        attempts,
        rng,
        |_solution, _to_period, to_room| to_room == primary,
        |_solution, _to_period, _to_room| false,
        |_solution, _to_period, to_room| to_room == primary,
        |_solution, _to_period, _to_room| true,
    )
}

fn fix_teacher_spread(
    problem: &Problem,
    solution: &mut Solution,
    evaluator: &Evaluator,
    teacher: TeacherId,
    attempts: u32,
    rng: &mut fastrand::Rng,
) -> bool {
    let Some((period, room)) = find_cell_for_teacher(problem, solution, teacher) else {
        return false;
    };
    let course = solution.get(period, room).unwrap();
    let day = period.day(problem.periods_per_day);

    targeted_fix(
        problem,
        solution,
        (period, room),
        attempts,
        rng,
        |_solution, to_period, _to_room| {
            let to_day = to_period.day(problem.periods_per_day);
            to_day != day
                && evaluator.teaches_on_day(teacher, to_day)
                && !problem.is_unavailable(course, to_period)
        },
        |_solution, to_period, _to_room| {
            let to_day = to_period.day(problem.periods_per_day);
            to_day != day && evaluator.teaches_on_day(teacher, to_day)
        },
        |solution, to_period, _to_room| {
            let to_day = to_period.day(problem.periods_per_day);
            let other = solution.get(to_period, _to_room).unwrap();
            let other_teacher = problem.course(other).teacher_id;
            to_day != day && evaluator.teaching_days_count(other_teacher) > 2
        },
        |_solution, to_period, _to_room| to_period.day(problem.periods_per_day) != day,
    )
}

fn fix_room_type(
    problem: &Problem,
    solution: &mut Solution,
    witness: (PeriodId, RoomId),
    attempts: u32,
    rng: &mut fastrand::Rng,
) -> bool {
    let (period, room) = witness;
    let Some(course_id) = solution.get(period, room) else {
        return false;
    };
    let course = problem.course(course_id);

    targeted_fix(
        problem,
        solution,
        (period, room),
        attempts,
        rng,
        |_solution, _to_period, to_room| problem.room_type_matches_exactly(course, problem.room(to_room)),
        |solution, to_period, to_room| {
            let other = solution.get(to_period, to_room);
            problem.room_type_matches_exactly(course, problem.room(to_room))
                && other.is_some_and(|o| problem.room_type_matches_exactly(problem.course(o), problem.room(room)))
        },
        |solution, to_period, to_room| {
            let other = solution.get(to_period, to_room).unwrap();
            !problem.room_type_matches_exactly(problem.course(other), problem.room(to_room))
        },
        |_solution, _to_period, _to_room| true,
    )
}

fn fix_same_day_duplicate(
    problem: &Problem,
    solution: &mut Solution,
    witness: (PeriodId, RoomId),
    attempts: u32,
    rng: &mut fastrand::Rng,
) -> bool {
    let (period, room) = witness;
    let Some(course_id) = solution.get(period, room) else {
        return false;
    };
    let day = period.day(problem.periods_per_day);

    targeted_fix(
        problem,
        solution,
        (period, room),
        attempts,
        rng,
        |_solution, to_period, _to_room| {
            to_period.day(problem.periods_per_day) != day
                && !problem.is_unavailable(course_id, to_period)
        },
        |_solution, to_period, _to_room| to_period.day(problem.periods_per_day) != day,
        |_solution, to_period, _to_room| to_period.day(problem.periods_per_day) == day,
        |_solution, to_period, _to_room| to_period.day(problem.periods_per_day) != day,
    )
}

/// Repeats `reps` swaps, each requiring at least one cell of the pair to be
/// occupied so the move is never a no-op.
fn random_same_period_swap(problem: &Problem, solution: &mut Solution, reps: u32, rng: &mut fastrand::Rng) {
    for _ in 0..reps {
        let period = random_period(problem, rng);
        let room_a = random_room(problem, rng);
        let room_b = random_room(problem, rng);
        if room_a == room_b {
            continue;
        }
        if solution.get(period, room_a).is_none() && solution.get(period, room_b).is_none() {
            continue;
        }
        solution.swap_cells(period, room_a, period, room_b);
    }
}

fn random_same_room_swap(problem: &Problem, solution: &mut Solution, reps: u32, rng: &mut fastrand::Rng) {
    for _ in 0..reps {
        let room = random_room(problem, rng);
        let period_a = random_period(problem, rng);
        let period_b = random_period(problem, rng);
        if period_a == period_b {
            continue;
        }
        if solution.get(period_a, room).is_none() && solution.get(period_b, room).is_none() {
            continue;
        }
        solution.swap_cells(period_a, room, period_b, room);
    }
}

fn random_anywhere_swap(problem: &Problem, solution: &mut Solution, reps: u32, rng: &mut fastrand::Rng) {
    for _ in 0..reps {
        let period_a = random_period(problem, rng);
        let room_a = random_room(problem, rng);
        let period_b = random_period(problem, rng);
        let room_b = random_room(problem, rng);
        if (period_a, room_a) == (period_b, room_b) {
            continue;
        }
        if solution.get(period_a, room_a).is_none() && solution.get(period_b, room_b).is_none() {
            continue;
        }
        solution.swap_cells(period_a, room_a, period_b, room_b);
    }
}

/// Draws a move class via the violation-weighted roulette and mutates
/// `solution` in place. Requires `evaluator` to reflect the previous
/// evaluation of `solution`.
pub fn mutate(
    problem: &Problem,
    solution: &mut Solution,
    evaluator: &mut Evaluator,
    temperature: f64,
    rng: &mut fastrand::Rng,
) {
    let attempts = attempts_for_temperature(temperature);
    let m = rng.i64(0..1000);
    let v = *evaluator.violations();
    let w = *evaluator.witnesses();

    if v.r2_teacher > 0 && m < 100 + (v.r2_teacher % 1000).saturating_mul(128) {
        if let Some(witness) = w.r2_teacher {
            if fix_teacher_conflict(problem, solution, evaluator, witness, attempts, rng) {
                evaluator.witnesses_mut().r2_teacher = None;
                evaluator.violations_mut().r2_teacher -= 1;
                return;
            }
        }
    } else if v.r2_curriculum > 0 && m < 100 + v.r2_curriculum / 8 {
        if let Some(witness) = w.r2_curriculum {
            if fix_curriculum_conflict(problem, solution, evaluator, witness, attempts, rng) {
                evaluator.witnesses_mut().r2_curriculum = None;
                evaluator.violations_mut().r2_curriculum -= 1;
                return;
            }
        }
    } else if v.r6 > 0 && m < 200 + 2 * v.r6 {
        if let Some(witness) = w.r6 {
            if fix_isolation(problem, solution, witness, attempts, rng) {
                evaluator.witnesses_mut().r6 = None;
                evaluator.violations_mut().r6 -= 1;
                return;
            }
        }
    } else if v.r7 > 0 && m < 300 + v.r7 {
        if let Some(witness) = w.r7 {
            if fix_over_capacity(problem, solution, witness, attempts, rng) {
                evaluator.witnesses_mut().r7 = None;
                evaluator.violations_mut().r7 = 0;
                return;
            }
        }
    } else if v.r8 > 0 && m < 400 + v.r8 {
        if let Some(course) = w.r8 {
            if fix_room_instability(problem, solution, evaluator, course, attempts, rng) {
                evaluator.witnesses_mut().r8 = None;
                evaluator.violations_mut().r8 -= 1;
                return;
            }
        }
    } else if v.r9 > 0 && m < 500 + 20 * v.r9 {
        if let Some(teacher) = w.r9 {
            if fix_teacher_spread(problem, solution, evaluator, teacher, attempts, rng) {
                evaluator.witnesses_mut().r9 = None;
                evaluator.violations_mut().r9 -= 1;
                return;
            }
        }
    } else if v.r10 > 0 && m < 600 + v.r10 {
        if let Some(witness) = w.r10 {
            if fix_room_type(problem, solution, witness, attempts, rng) {
                evaluator.witnesses_mut().r10 = None;
                evaluator.violations_mut().r10 -= 1;
                return;
            }
        }
    } else if v.r11 > 0 && m < 700 + 100 * v.r11 {
        if let Some(witness) = w.r11 {
            if fix_same_day_duplicate(problem, solution, witness, attempts, rng) {
                evaluator.witnesses_mut().r11 = None;
                evaluator.violations_mut().r11 -= 1;
                return;
            }
        }
    }

    if m < 800 {
        random_same_period_swap(problem, solution, attempts * 2, rng);
    } else if m < 900 {
        random_same_room_swap(problem, solution, attempts, rng);
    } else {
        random_anywhere_swap(problem, solution, attempts, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Course, Room, Teacher, UnavailabilityTable};

    fn two_room_problem() -> Problem {
        Problem {
            name: "t".into(),
            days: 2,
            periods_per_day: 2,
            rooms: vec![
                Room { name: "R0".into(), capacity: 30, room_type: 1 },
                Room { name: "R1".into(), capacity: 30, room_type: 2 },
            ],
            teachers: vec![Teacher { name: "T0".into() }],
            courses: vec![Course {
                name: "C0".into(),
                teacher_id: TeacherId::from_index(0),
                lecture_count: 1,
                min_days: 1,
                student_count: 10,
                required_room_type: 2,
                curricula: vec![],
            }],
            curricula: vec![],
            unavailability: UnavailabilityTable::build(1, vec![]),
        }
    }

    #[test]
    fn fix_room_type_eventually_relocates_to_a_matching_room() {
        let problem = two_room_problem();
        let mut solution = Solution::new_empty(&problem);
        let period = PeriodId::from_index(0);
        solution.set(period, RoomId::from_index(0), Some(CourseId::from_index(0)));

        let mut rng = fastrand::Rng::with_seed(7);
        let fixed = fix_room_type(
            &problem,
            &mut solution,
            (period, RoomId::from_index(0)),
            64,
            &mut rng,
        );

        assert!(fixed);
        let new_room = solution
            .occupied_cells()
            .next()
            .map(|(_, room, _)| room)
            .unwrap();
        assert_eq!(new_room, RoomId::from_index(1));
    }

    fn two_room_neither_matching_problem() -> Problem {
        Problem {
            name: "t3".into(),
            days: 1,
            periods_per_day: 1,
            rooms: vec![
                Room { name: "R0".into(), capacity: 30, room_type: 1 },
                Room { name: "R1".into(), capacity: 30, room_type: 1 },
            ],
            teachers: vec![Teacher { name: "T0".into() }],
            courses: vec![
                Course {
                    name: "A".into(),
                    teacher_id: TeacherId::from_index(0),
                    lecture_count: 1,
                    min_days: 1,
                    student_count: 10,
                    required_room_type: 2,
                    curricula: vec![],
                },
                Course {
                    name: "B".into(),
                    teacher_id: TeacherId::from_index(0),
                    lecture_count: 1,
                    min_days: 1,
                    student_count: 10,
                    required_room_type: 2,
                    curricula: vec![],
                },
            ],
            curricula: vec![],
            unavailability: UnavailabilityTable::build(2, vec![]),
        }
    }

    #[test]
    fn fix_room_type_swaps_with_another_mismatched_occupant_when_no_room_matches() {
        // Neither room is ever the right type for either course, so
        // `resolves` and `beneficial_swap` can never fire; the fix has to
        // fall back to swapping with a target that's mismatched too.
        let problem = two_room_neither_matching_problem();
        let mut solution = Solution::new_empty(&problem);
        let period = PeriodId::from_index(0);
        solution.set(period, RoomId::from_index(0), Some(CourseId::from_index(0)));
        solution.set(period, RoomId::from_index(1), Some(CourseId::from_index(1)));

        let mut rng = fastrand::Rng::with_seed(11);
        let fixed = fix_room_type(
            &problem,
            &mut solution,
            (period, RoomId::from_index(0)),
            8,
            &mut rng,
        );

        assert!(fixed);
        assert_eq!(solution.get(period, RoomId::from_index(0)), Some(CourseId::from_index(1)));
        assert_eq!(solution.get(period, RoomId::from_index(1)), Some(CourseId::from_index(0)));
    }

    #[test]
    fn random_swaps_never_leave_both_ends_empty_and_empty() {
        let problem = two_room_problem();
        let mut solution = Solution::new_empty(&problem);
        solution.set(PeriodId::from_index(0), RoomId::from_index(0), Some(CourseId::from_index(0)));
        let mut rng = fastrand::Rng::with_seed(3);

        random_anywhere_swap(&problem, &mut solution, 20, &mut rng);

        assert_eq!(solution.occupied_cells().count(), 1);
    }
}
