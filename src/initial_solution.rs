//! Randomized greedy construction: the SA starting point, almost always
//! infeasible.

use crate::problem::{CourseId, PeriodId, Problem, RoomId};
use crate::solution::Solution;

/// For each lecture of each course, try a random `(period, room)` that
/// respects capacity, room type and unavailability. After three consecutive
/// failures on the same lecture, force it into any empty cell regardless of
/// compatibility — construction must terminate even on overconstrained
/// instances.
pub fn initial_construct(problem: &Problem, rng: &mut fastrand::Rng) -> Solution {
    let mut solution = Solution::new_empty(problem);

    for (course_idx, course) in problem.courses.iter().enumerate() {
        let course_id = CourseId::from_index(course_idx);

        for _ in 0..course.lecture_count {
            let mut failures = 0;
            loop {
                let period = PeriodId::from_index(rng.usize(0..problem.total_periods()));
                let room = RoomId::from_index(rng.usize(0..problem.num_rooms()));

                if solution.get(period, room).is_some() {
                    failures += 1;
                } else if problem.is_unavailable(course_id, period)
                    || !problem.room_acceptable_for_construction(course, problem.room(room))
                {
                    failures += 1;
                } else {
                    solution.set(period, room, Some(course_id));
                    break;
                }

                if failures >= 3 {
                    if let Some((period, room)) = find_any_empty_cell(problem, &solution, rng) {
                        solution.set(period, room, Some(course_id));
                    }
                    break;
                }
            }
        }
    }

    solution
}

/// Scans for an empty cell starting from a random offset, so the forced
/// placement doesn't always land near period 0 once the grid fills up.
fn find_any_empty_cell(
    problem: &Problem,
    solution: &Solution,
    rng: &mut fastrand::Rng,
) -> Option<(PeriodId, RoomId)> {
    let num_cells = problem.num_cells();
    let start = rng.usize(0..num_cells.max(1));

    for offset in 0..num_cells {
        let idx = (start + offset) % num_cells;
        let period = PeriodId::from_index(idx / problem.num_rooms());
        let room = RoomId::from_index(idx % problem.num_rooms());
        if solution.get(period, room).is_none() {
            return Some((period, room));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Course, Room, Teacher, UnavailabilityTable};

    fn problem_2x2() -> Problem {
        Problem {
            name: "t".into(),
            days: 2,
            periods_per_day: 1,
            rooms: vec![
                Room { name: "R0".into(), capacity: 30, room_type: 1 },
                Room { name: "R1".into(), capacity: 30, room_type: 1 },
            ],
            teachers: vec![Teacher { name: "T0".into() }],
            courses: vec![Course {
                name: "C0".into(),
                teacher_id: crate::problem::TeacherId::from_index(0),
                lecture_count: 2,
                min_days: 1,
                student_count: 10,
                required_room_type: 1,
                curricula: vec![],
            }],
            curricula: vec![],
            unavailability: UnavailabilityTable::build(1, vec![]),
        }
    }

    #[test]
    fn places_exactly_lecture_count_cells_per_course() {
        let problem = problem_2x2();
        let mut rng = fastrand::Rng::with_seed(1);
        let solution = initial_construct(&problem, &mut rng);

        let placed = solution
            .occupied_cells()
            .filter(|&(_, _, c)| c == CourseId::from_index(0))
            .count();
        assert_eq!(placed, 2);
    }

    #[test]
    fn never_double_books_a_cell() {
        let problem = problem_2x2();
        let mut rng = fastrand::Rng::with_seed(99);
        let solution = initial_construct(&problem, &mut rng);

        assert_eq!(solution.occupied_cells().count(), 2);
    }

    #[test]
    fn terminates_even_when_every_lecture_must_be_forced() {
        // Only one cell exists for two lectures: the second must be forced.
        let mut problem = problem_2x2();
        problem.days = 1;
        problem.rooms.truncate(1);

        let mut rng = fastrand::Rng::with_seed(5);
        let solution = initial_construct(&problem, &mut rng);

        // At most one cell can ever be occupied (1 period x 1 room).
        assert!(solution.occupied_cells().count() <= 1);
    }
}
