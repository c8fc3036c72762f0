//! Immutable instance data: rooms, teachers, courses, curricula and
//! unavailability, plus the small integer-id newtypes everything else is
//! keyed by.

macro_rules! index_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u16);

        impl $name {
            pub fn from_index(index: usize) -> Self {
                $name(index as u16)
            }

            pub fn raw_index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_id!(CourseId);
index_id!(RoomId);
index_id!(TeacherId);
index_id!(CurriculumId);

/// A flattened `day * periods_per_day + period_of_day` timeslot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodId(u16);

impl PeriodId {
    pub fn from_index(index: usize) -> Self {
        PeriodId(index as u16)
    }

    pub fn raw_index(self) -> usize {
        self.0 as usize
    }

    pub fn day(self, periods_per_day: u16) -> u16 {
        self.0 / periods_per_day
    }

    pub fn period_of_day(self, periods_per_day: u16) -> u16 {
        self.0 % periods_per_day
    }

    pub fn from_day_period(day: u16, period_of_day: u16, periods_per_day: u16) -> Self {
        PeriodId(day * periods_per_day + period_of_day)
    }

    /// The period immediately before this one in the same day, if any.
    pub fn prev_same_day(self, periods_per_day: u16) -> Option<Self> {
        if self.period_of_day(periods_per_day) == 0 {
            None
        } else {
            Some(PeriodId(self.0 - 1))
        }
    }

    /// The period immediately after this one in the same day, if any.
    pub fn next_same_day(self, periods_per_day: u16) -> Option<Self> {
        if self.period_of_day(periods_per_day) + 1 == periods_per_day {
            None
        } else {
            Some(PeriodId(self.0 + 1))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub name: String,
    pub capacity: u16,
    pub room_type: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teacher {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub name: String,
    pub teacher_id: TeacherId,
    pub lecture_count: u16,
    pub min_days: u16,
    pub student_count: u16,
    pub required_room_type: u16,
    /// Curricula that include this course, in declaration order.
    pub curricula: Vec<CurriculumId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curriculum {
    pub name: String,
    pub course_ids: Vec<CourseId>,
}

/// A witness-friendly view over the unavailability table: one contiguous
/// `(day, period_of_day)` range per course, into a single flat array sorted
/// by course.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnavailabilityTable {
    entries: Vec<(u16, u16)>,
    /// `range[c]` is the half-open range of `entries` belonging to course `c`.
    ranges: Vec<Option<(usize, usize)>>,
}

impl UnavailabilityTable {
    pub fn build(num_courses: usize, mut by_course: Vec<(CourseId, u16, u16)>) -> Self {
        by_course.sort_by_key(|&(course, day, period)| (course.raw_index(), day, period));

        let mut entries = Vec::with_capacity(by_course.len());
        let mut ranges = vec![None; num_courses];

        let mut idx = 0;
        while idx < by_course.len() {
            let course = by_course[idx].0;
            let start = entries.len();
            while idx < by_course.len() && by_course[idx].0 == course {
                entries.push((by_course[idx].1, by_course[idx].2));
                idx += 1;
            }
            ranges[course.raw_index()] = Some((start, entries.len()));
        }

        UnavailabilityTable { entries, ranges }
    }

    pub fn is_unavailable(&self, course: CourseId, day: u16, period_of_day: u16) -> bool {
        match self.ranges.get(course.raw_index()).copied().flatten() {
            Some((lo, hi)) => self.entries[lo..hi].contains(&(day, period_of_day)),
            None => false,
        }
    }

    /// Every `(course, day, period_of_day)` triple, course-major. Used by
    /// `parser::write_instance` to round-trip the table back into rows.
    pub fn iter(&self) -> impl Iterator<Item = (CourseId, u16, u16)> + '_ {
        self.ranges.iter().enumerate().flat_map(move |(c, range)| {
            let (lo, hi) = range.unwrap_or((0, 0));
            self.entries[lo..hi]
                .iter()
                .map(move |&(day, period)| (CourseId::from_index(c), day, period))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub name: String,
    pub days: u16,
    pub periods_per_day: u16,
    pub rooms: Vec<Room>,
    pub teachers: Vec<Teacher>,
    pub courses: Vec<Course>,
    pub curricula: Vec<Curriculum>,
    pub unavailability: UnavailabilityTable,
}

impl Problem {
    pub fn total_periods(&self) -> usize {
        self.days as usize * self.periods_per_day as usize
    }

    pub fn num_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn num_cells(&self) -> usize {
        self.total_periods() * self.num_rooms()
    }

    pub fn course(&self, id: CourseId) -> &Course {
        &self.courses[id.raw_index()]
    }

    pub fn room(&self, id: RoomId) -> &Room {
        &self.rooms[id.raw_index()]
    }

    pub fn teacher(&self, id: TeacherId) -> &Teacher {
        &self.teachers[id.raw_index()]
    }

    pub fn curriculum(&self, id: CurriculumId) -> &Curriculum {
        &self.curricula[id.raw_index()]
    }

    pub fn is_unavailable(&self, course: CourseId, period: PeriodId) -> bool {
        self.unavailability.is_unavailable(
            course,
            period.day(self.periods_per_day),
            period.period_of_day(self.periods_per_day),
        )
    }

    /// The permissive compatibility check used by the initial constructor:
    /// capacity must suffice and the room's type must be at least as
    /// specific as required. The evaluator uses a strict `==` instead (see
    /// `room_type_matches_exactly`) — over-typed rooms are legal at
    /// construction time but penalized by R10 once placed.
    pub fn room_acceptable_for_construction(&self, course: &Course, room: &Room) -> bool {
        room.capacity >= course.student_count && room.room_type >= course.required_room_type
    }

    pub fn room_type_matches_exactly(&self, course: &Course, room: &Room) -> bool {
        room.room_type == course.required_room_type
    }

    pub fn room_fits_capacity(&self, course: &Course, room: &Room) -> bool {
        room.capacity >= course.student_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: usize) -> CourseId {
        CourseId::from_index(i)
    }

    #[test]
    fn period_day_and_period_of_day_round_trip() {
        let p = PeriodId::from_day_period(2, 3, 5);
        assert_eq!(p.day(5), 2);
        assert_eq!(p.period_of_day(5), 3);
    }

    #[test]
    fn prev_and_next_same_day_respect_day_boundaries() {
        let first = PeriodId::from_day_period(1, 0, 4);
        assert_eq!(first.prev_same_day(4), None);
        assert_eq!(first.next_same_day(4), Some(PeriodId::from_day_period(1, 1, 4)));

        let last = PeriodId::from_day_period(1, 3, 4);
        assert_eq!(last.next_same_day(4), None);
        assert_eq!(last.prev_same_day(4), Some(PeriodId::from_day_period(1, 2, 4)));
    }

    #[test]
    fn unavailability_table_groups_rows_by_course() {
        let table = UnavailabilityTable::build(
            3,
            vec![(id(2), 1, 0), (id(0), 0, 0), (id(0), 1, 1), (id(2), 0, 0)],
        );

        assert!(table.is_unavailable(id(0), 0, 0));
        assert!(table.is_unavailable(id(0), 1, 1));
        assert!(!table.is_unavailable(id(0), 0, 1));
        assert!(table.is_unavailable(id(2), 1, 0));
        assert!(!table.is_unavailable(id(1), 0, 0));
    }

    #[test]
    fn unavailability_table_is_empty_for_u_zero() {
        let table = UnavailabilityTable::build(2, vec![]);
        assert!(!table.is_unavailable(id(0), 0, 0));
        assert!(!table.is_unavailable(id(1), 3, 2));
    }
}
