//! The objective function: a single pass over the grid that recomputes `fo`
//! and rebuilds every auxiliary index the neighborhood generator depends on.

use crate::problem::{CourseId, CurriculumId, PeriodId, Problem, RoomId, TeacherId};
use crate::solution::Solution;

/// Weight of every hard constraint (R1, R2, R4, R10, R11).
pub const HARD_WEIGHT: i64 = 1_000_000;

/// Per-constraint violation counters. R1 and R4 are penalized but have
/// no dedicated move class in the neighborhood generator — see REDESIGN
/// FLAGS — so only the eight targeted constraints also carry a witness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Violations {
    pub r1: i64,
    pub r2_teacher: i64,
    pub r2_curriculum: i64,
    pub r4: i64,
    pub r5: i64,
    pub r6: i64,
    pub r7: i64,
    pub r8: i64,
    pub r9: i64,
    pub r10: i64,
    pub r11: i64,
}

/// One remembered coordinate per violated constraint kind, consumed by the
/// move dispatcher instead of scanning the whole grid again. Overwritten in
/// place whenever a later instance of the same violation is found during a
/// pass; whichever was found last in period-major order wins, except r7
/// which keeps whichever instance has the largest capacity excess.
#[derive(Debug, Clone, Copy, Default)]
pub struct Witnesses {
    pub r2_teacher: Option<(PeriodId, TeacherId)>,
    pub r2_curriculum: Option<(PeriodId, CurriculumId)>,
    pub r6: Option<(PeriodId, RoomId, CurriculumId)>,
    pub r7: Option<(PeriodId, RoomId)>,
    pub r8: Option<CourseId>,
    pub r9: Option<TeacherId>,
    pub r10: Option<(PeriodId, RoomId)>,
    pub r11: Option<(PeriodId, RoomId)>,
}

/// Seeds R9 (teacher weekly-day spread) with a phase-1 teacher/day occupancy
/// bitmap for the two-phase composition in `phases.rs`. Teacher ids carry
/// over positionally: phase 2's teacher `i` inherits phase 1's teacher `i`'s
/// occupied days.
#[derive(Debug, Clone)]
pub struct TeacherDaySeed {
    days: u16,
    num_teachers: usize,
    bits: Box<[bool]>,
}

impl TeacherDaySeed {
    pub fn from_solution(problem: &Problem, solution: &Solution) -> Self {
        let days = problem.days;
        let mut bits = vec![false; problem.teachers.len() * days as usize].into_boxed_slice();

        for (period, _room, course) in solution.occupied_cells() {
            let teacher = problem.course(course).teacher_id;
            let d = period.day(problem.periods_per_day);
            bits[teacher.raw_index() * days as usize + d as usize] = true;
        }

        TeacherDaySeed {
            days,
            num_teachers: problem.teachers.len(),
            bits,
        }
    }

    fn get(&self, teacher: TeacherId, day: u16) -> bool {
        if teacher.raw_index() >= self.num_teachers || day >= self.days {
            false
        } else {
            self.bits[teacher.raw_index() * self.days as usize + day as usize]
        }
    }
}

/// Owns the auxiliary arrays the single evaluation pass rebuilds each call.
/// The neighborhood generator only ever sees the read-only
/// `violations()`/`witnesses()` views plus the narrow per-cell queries below.
pub struct Evaluator {
    num_teachers: usize,
    num_curricula: usize,
    num_courses: usize,
    days: u16,
    periods_per_day: u16,
    total_periods: usize,

    r1: Vec<u16>,
    r21: Vec<u16>,
    r22: Vec<u16>,
    r5: Vec<u16>,
    r8: Vec<Option<RoomId>>,
    r9: Vec<bool>,
    r11: Vec<u16>,

    violations: Violations,
    witnesses: Witnesses,
    fo: i64,

    seed_r9: Option<TeacherDaySeed>,
}

impl Evaluator {
    pub fn new(problem: &Problem) -> Self {
        let num_courses = problem.courses.len();
        let num_teachers = problem.teachers.len();
        let num_curricula = problem.curricula.len();
        let total_periods = problem.total_periods();

        Evaluator {
            num_teachers,
            num_curricula,
            num_courses,
            days: problem.days,
            periods_per_day: problem.periods_per_day,
            total_periods,
            r1: vec![0; num_courses],
            r21: vec![0; total_periods * num_teachers],
            r22: vec![0; total_periods * num_curricula],
            r5: vec![0; num_courses * problem.days as usize],
            r8: vec![None; num_courses],
            r9: vec![false; num_teachers * problem.days as usize],
            r11: vec![0; problem.days as usize * num_courses],
            violations: Violations::default(),
            witnesses: Witnesses::default(),
            fo: 0,
            seed_r9: None,
        }
    }

    pub fn set_seed_r9(&mut self, seed: Option<TeacherDaySeed>) {
        self.seed_r9 = seed;
    }

    pub fn fo(&self) -> i64 {
        self.fo
    }

    pub fn violations(&self) -> &Violations {
        &self.violations
    }

    pub fn witnesses(&self) -> &Witnesses {
        &self.witnesses
    }

    pub fn witnesses_mut(&mut self) -> &mut Witnesses {
        &mut self.witnesses
    }

    /// Lets the move dispatcher optimistically decrement a counter right
    /// after fixing its witness, ahead of the next full `evaluate()` pass.
    pub fn violations_mut(&mut self) -> &mut Violations {
        &mut self.violations
    }

    fn r21_index(&self, period: PeriodId, teacher: TeacherId) -> usize {
        period.raw_index() * self.num_teachers + teacher.raw_index()
    }

    fn r22_index(&self, period: PeriodId, curriculum: CurriculumId) -> usize {
        period.raw_index() * self.num_curricula + curriculum.raw_index()
    }

    fn r5_index(&self, course: CourseId, day: u16) -> usize {
        course.raw_index() * self.days as usize + day as usize
    }

    fn r9_index(&self, teacher: TeacherId, day: u16) -> usize {
        teacher.raw_index() * self.days as usize + day as usize
    }

    fn r11_index(&self, day: u16, course: CourseId) -> usize {
        day as usize * self.num_courses + course.raw_index()
    }

    fn zero(&mut self) {
        self.r1.iter_mut().for_each(|x| *x = 0);
        self.r21.iter_mut().for_each(|x| *x = 0);
        self.r22.iter_mut().for_each(|x| *x = 0);
        self.r5.iter_mut().for_each(|x| *x = 0);
        self.r8.iter_mut().for_each(|x| *x = None);
        self.r9.iter_mut().for_each(|x| *x = false);
        self.r11.iter_mut().for_each(|x| *x = 0);
        self.violations = Violations::default();
        self.witnesses = Witnesses::default();
    }

    pub fn teacher_conflict_at(&self, period: PeriodId, teacher: TeacherId) -> bool {
        self.r21[self.r21_index(period, teacher)] > 1
    }

    pub fn curriculum_conflict_at(&self, period: PeriodId, curriculum: CurriculumId) -> bool {
        self.r22[self.r22_index(period, curriculum)] > 1
    }

    pub fn teaches_on_day(&self, teacher: TeacherId, day: u16) -> bool {
        self.r9[self.r9_index(teacher, day)]
    }

    /// Number of distinct days `teacher` currently teaches on, per the last
    /// `evaluate()` pass (including any `seed_r9` bits carried over).
    pub fn teaching_days_count(&self, teacher: TeacherId) -> u16 {
        (0..self.days)
            .filter(|&day| self.teaches_on_day(teacher, day))
            .count() as u16
    }

    pub fn primary_room(&self, course: CourseId) -> Option<RoomId> {
        self.r8[course.raw_index()]
    }

    pub fn duplicate_on_day(&self, day: u16, course: CourseId) -> bool {
        self.r11[self.r11_index(day, course)] > 1
    }

    /// Full single-pass recomputation of `fo` and every auxiliary index.
    /// `solution.fo` is not touched here; callers that want it kept in sync
    /// assign it from the return value themselves (see `solver.rs`).
    pub fn evaluate(&mut self, problem: &Problem, solution: &Solution) -> i64 {
        self.zero();

        if let Some(seed) = &self.seed_r9 {
            for teacher_idx in 0..self.num_teachers {
                let teacher = TeacherId::from_index(teacher_idx);
                for day in 0..self.days {
                    if seed.get(teacher, day) {
                        let idx = self.r9_index(teacher, day);
                        self.r9[idx] = true;
                    }
                }
            }
        }

        let mut fo: i64 = 0;
        let mut r7_witness_excess: i64 = 0;

        for (period, room, course_id) in solution.occupied_cells() {
            let course = problem.course(course_id);
            let day = period.day(self.periods_per_day);

            self.r1[course_id.raw_index()] += 1;

            let t = course.teacher_id;
            let r21_idx = self.r21_index(period, t);
            self.r21[r21_idx] += 1;
            if self.r21[r21_idx] > 1 {
                self.witnesses.r2_teacher = Some((period, t));
            }

            for &k in &course.curricula {
                let r22_idx = self.r22_index(period, k);
                self.r22[r22_idx] += 1;
                if self.r22[r22_idx] > 1 {
                    self.witnesses.r2_curriculum = Some((period, k));
                }
            }

            if problem.is_unavailable(course_id, period) {
                fo += HARD_WEIGHT;
                self.violations.r4 += 1;
            }

            let r5_idx = self.r5_index(course_id, day);
            self.r5[r5_idx] += 1;

            let r11_idx = self.r11_index(day, course_id);
            self.r11[r11_idx] += 1;
            if self.r11[r11_idx] > 1 {
                self.witnesses.r11 = Some((period, room));
            }

            for &k in &course.curricula {
                let mut has_neighbor = false;
                for neighbor_period in [
                    period.prev_same_day(self.periods_per_day),
                    period.next_same_day(self.periods_per_day),
                ]
                .into_iter()
                .flatten()
                {
                    for room_idx in 0..problem.num_rooms() {
                        let neighbor_room = RoomId::from_index(room_idx);
                        if let Some(other_course) = solution.get(neighbor_period, neighbor_room) {
                            if problem.course(other_course).curricula.contains(&k) {
                                has_neighbor = true;
                                break;
                            }
                        }
                    }
                    if has_neighbor {
                        break;
                    }
                }
                if !has_neighbor {
                    fo += 2;
                    self.violations.r6 += 1;
                    self.witnesses.r6 = Some((period, room, k));
                }
            }

            let room_data = problem.room(room);
            if course.student_count > room_data.capacity {
                let excess = (course.student_count - room_data.capacity) as i64;
                fo += excess;
                self.violations.r7 += excess;
                if excess > r7_witness_excess {
                    r7_witness_excess = excess;
                    self.witnesses.r7 = Some((period, room));
                }
            }

            match self.r8[course_id.raw_index()] {
                None => self.r8[course_id.raw_index()] = Some(room),
                Some(primary) if primary != room => {
                    fo += 1;
                    self.violations.r8 += 1;
                    self.witnesses.r8 = Some(course_id);
                }
                Some(_) => {}
            }

            let idx = self.r9_index(t, day);
            self.r9[idx] = true;

            if !problem.room_type_matches_exactly(course, room_data) {
                fo += HARD_WEIGHT;
                self.violations.r10 += 1;
                self.witnesses.r10 = Some((period, room));
            }
        }

        for (c, &placed) in self.r1.iter().enumerate() {
            let required = problem.courses[c].lecture_count;
            let diff = (placed as i64 - required as i64).abs();
            if diff > 0 {
                fo += HARD_WEIGHT * diff;
                self.violations.r1 += diff;
            }
        }

        for period_idx in 0..self.total_periods {
            for teacher_idx in 0..self.num_teachers {
                let count = self.r21[period_idx * self.num_teachers + teacher_idx];
                if count > 1 {
                    let conflicts = (count - 1) as i64;
                    fo += HARD_WEIGHT * conflicts;
                    self.violations.r2_teacher += conflicts;
                }
            }
            for curriculum_idx in 0..self.num_curricula {
                let count = self.r22[period_idx * self.num_curricula + curriculum_idx];
                if count > 1 {
                    let conflicts = (count - 1) as i64;
                    fo += HARD_WEIGHT * conflicts;
                    self.violations.r2_curriculum += conflicts;
                }
            }
        }

        for (c, course) in problem.courses.iter().enumerate() {
            let used_days = (0..self.days as usize)
                .filter(|&d| self.r5[c * self.days as usize + d] > 0)
                .count() as u16;
            if course.min_days > used_days {
                let deficit = (course.min_days - used_days) as i64;
                fo += 5 * deficit;
                self.violations.r5 += deficit;
            }
        }

        for teacher_idx in 0..self.num_teachers {
            let teaching_days = (0..self.days)
                .filter(|&d| self.r9[teacher_idx * self.days as usize + d as usize])
                .count() as i64;
            if teaching_days > 2 {
                let over = teaching_days - 2;
                fo += 5 * over;
                self.violations.r9 += over;
                self.witnesses.r9 = Some(TeacherId::from_index(teacher_idx));
            }
        }

        for day in 0..self.days {
            for c in 0..self.num_courses {
                let count = self.r11[day as usize * self.num_courses + c];
                if count > 1 {
                    let dupes = (count - 1) as i64;
                    fo += HARD_WEIGHT * dupes;
                    self.violations.r11 += dupes;
                }
            }
        }

        self.fo = fo;
        fo
    }
}
