//! The mutable timetable grid the engine searches over.

use crate::problem::{CourseId, PeriodId, Problem, RoomId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    total_periods: usize,
    num_rooms: usize,
    grid: Box<[Option<CourseId>]>,
    /// Valid only after the solution has gone through `Evaluator::evaluate`
    /// at least once.
    pub fo: i64,
}

impl Solution {
    pub fn new_empty(problem: &Problem) -> Self {
        Solution {
            total_periods: problem.total_periods(),
            num_rooms: problem.num_rooms(),
            grid: vec![None; problem.num_cells()].into_boxed_slice(),
            fo: 0,
        }
    }

    fn index(&self, period: PeriodId, room: RoomId) -> usize {
        period.raw_index() * self.num_rooms + room.raw_index()
    }

    pub fn get(&self, period: PeriodId, room: RoomId) -> Option<CourseId> {
        self.grid[self.index(period, room)]
    }

    pub fn set(&mut self, period: PeriodId, room: RoomId, course: Option<CourseId>) {
        let idx = self.index(period, room);
        self.grid[idx] = course;
    }

    pub fn total_periods(&self) -> usize {
        self.total_periods
    }

    pub fn num_rooms(&self) -> usize {
        self.num_rooms
    }

    /// Iterates over every `(period, room, course)` triple with a non-empty
    /// course, in period-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (PeriodId, RoomId, CourseId)> + '_ {
        self.grid.iter().enumerate().filter_map(move |(idx, cell)| {
            cell.map(|course| {
                let period = PeriodId::from_index(idx / self.num_rooms);
                let room = RoomId::from_index(idx % self.num_rooms);
                (period, room, course)
            })
        })
    }

    pub fn relocate(&mut self, from_period: PeriodId, from_room: RoomId, to_period: PeriodId, to_room: RoomId) {
        let course = self.get(from_period, from_room);
        debug_assert!(course.is_some(), "relocating an empty cell");
        debug_assert!(self.get(to_period, to_room).is_none(), "relocating onto an occupied cell");
        self.set(from_period, from_room, None);
        self.set(to_period, to_room, course);
    }

    pub fn swap_cells(&mut self, period_a: PeriodId, room_a: RoomId, period_b: PeriodId, room_b: RoomId) {
        let idx_a = self.index(period_a, room_a);
        let idx_b = self.index(period_b, room_b);
        self.grid.swap(idx_a, idx_b);
    }
}

/// Deep element-wise copy of `src`'s grid and `fo` into `dst`, reusing `dst`'s
/// allocation instead of cloning a fresh one.
pub fn copy_into(dst: &mut Solution, src: &Solution) {
    debug_assert_eq!(dst.total_periods, src.total_periods);
    debug_assert_eq!(dst.num_rooms, src.num_rooms);
    dst.grid.copy_from_slice(&src.grid);
    dst.fo = src.fo;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Course, Curriculum, Room, Teacher, UnavailabilityTable};

    fn tiny_problem(periods: usize, rooms: usize) -> Problem {
        Problem {
            name: "test".into(),
            days: periods as u16,
            periods_per_day: 1,
            rooms: (0..rooms)
                .map(|i| Room {
                    name: format!("R{i}"),
                    capacity: 30,
                    room_type: 0,
                })
                .collect(),
            teachers: vec![Teacher { name: "T0".into() }],
            courses: vec![Course {
                name: "C0".into(),
                teacher_id: crate::problem::TeacherId::from_index(0),
                lecture_count: 1,
                min_days: 1,
                student_count: 10,
                required_room_type: 0,
                curricula: vec![],
            }],
            curricula: vec![Curriculum {
                name: "K0".into(),
                course_ids: vec![],
            }],
            unavailability: UnavailabilityTable::build(1, vec![]),
        }
    }

    #[test]
    fn new_empty_solution_has_every_cell_empty() {
        let problem = tiny_problem(3, 2);
        let solution = Solution::new_empty(&problem);
        assert_eq!(solution.occupied_cells().count(), 0);
    }

    #[test]
    fn relocate_moves_course_and_empties_source() {
        let problem = tiny_problem(3, 2);
        let mut solution = Solution::new_empty(&problem);
        let c0 = CourseId::from_index(0);
        let p0 = PeriodId::from_index(0);
        let p1 = PeriodId::from_index(1);
        let r0 = RoomId::from_index(0);

        solution.set(p0, r0, Some(c0));
        solution.relocate(p0, r0, p1, r0);

        assert_eq!(solution.get(p0, r0), None);
        assert_eq!(solution.get(p1, r0), Some(c0));
    }

    #[test]
    fn swap_cells_exchanges_contents() {
        let problem = tiny_problem(3, 2);
        let mut solution = Solution::new_empty(&problem);
        let c0 = CourseId::from_index(0);
        let p0 = PeriodId::from_index(0);
        let p1 = PeriodId::from_index(1);
        let r0 = RoomId::from_index(0);

        solution.set(p0, r0, Some(c0));
        solution.swap_cells(p0, r0, p1, r0);

        assert_eq!(solution.get(p0, r0), None);
        assert_eq!(solution.get(p1, r0), Some(c0));

        // Two swaps of the same pair restore the grid bit-exactly.
        solution.swap_cells(p0, r0, p1, r0);
        assert_eq!(solution.get(p0, r0), Some(c0));
        assert_eq!(solution.get(p1, r0), None);
    }

    #[test]
    fn copy_into_reproduces_grid_and_fo() {
        let problem = tiny_problem(3, 2);
        let mut src = Solution::new_empty(&problem);
        src.set(PeriodId::from_index(0), RoomId::from_index(0), Some(CourseId::from_index(0)));
        src.fo = 42;

        let mut dst = Solution::new_empty(&problem);
        copy_into(&mut dst, &src);

        assert_eq!(dst, src);
    }
}
