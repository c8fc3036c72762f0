//! Reads the line-oriented ITC-like instance format into an immutable
//! `Problem`, and writes one back out in the same grammar.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::errors::{Error, Result};
use crate::problem::{
    Course, CourseId, Curriculum, CurriculumId, Problem, Room, RoomId, Teacher, TeacherId,
    UnavailabilityTable,
};

struct Lines<'a> {
    path: &'a str,
    lines: Vec<&'a str>,
    next: usize,
}

impl<'a> Lines<'a> {
    fn new(path: &'a str, text: &'a str) -> Self {
        Lines {
            path,
            lines: text.lines().collect(),
            next: 0,
        }
    }

    /// 1-based line number of the next line to be read.
    fn line_no(&self) -> usize {
        self.next + 1
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let line = self.lines.get(self.next)?;
        let line_no = self.line_no();
        self.next += 1;
        Some((line_no, line))
    }

    fn header(&mut self, expected_key: &str) -> Result<u32> {
        let (line_no, line) = self.next_line().ok_or_else(|| {
            Box::new(Error::BadHeaderLine {
                path: self.path.into(),
                line_no: self.line_no(),
                line: String::new(),
                expected_key: expected_key.into(),
            })
        })?;

        let (key, value) = line.split_once(':').ok_or_else(|| {
            Box::new(Error::BadHeaderLine {
                path: self.path.into(),
                line_no,
                line: line.into(),
                expected_key: expected_key.into(),
            })
        })?;

        if key.trim() != expected_key {
            return Err(Box::new(Error::BadHeaderLine {
                path: self.path.into(),
                line_no,
                line: line.into(),
                expected_key: expected_key.into(),
            }));
        }

        value.trim().parse::<u32>().map_err(|_| {
            Box::new(Error::BadHeaderValue {
                path: self.path.into(),
                line_no,
                key: expected_key.into(),
                value: value.trim().into(),
            })
        })
    }

    fn name_header(&mut self, expected_key: &str) -> Result<String> {
        let (line_no, line) = self.next_line().ok_or_else(|| {
            Box::new(Error::BadHeaderLine {
                path: self.path.into(),
                line_no: self.line_no(),
                line: String::new(),
                expected_key: expected_key.into(),
            })
        })?;

        let (key, value) = line.split_once(':').ok_or_else(|| {
            Box::new(Error::BadHeaderLine {
                path: self.path.into(),
                line_no,
                line: line.into(),
                expected_key: expected_key.into(),
            })
        })?;

        if key.trim() != expected_key {
            return Err(Box::new(Error::BadHeaderLine {
                path: self.path.into(),
                line_no,
                line: line.into(),
                expected_key: expected_key.into(),
            }));
        }

        Ok(value.trim().to_string())
    }

    fn section_keyword(&mut self, expected: &str) -> Result<()> {
        let (line_no, line) = self.next_line().ok_or_else(|| {
            Box::new(Error::BadSectionKeyword {
                path: self.path.into(),
                line_no: self.line_no(),
                expected: expected.into(),
                found: String::new(),
            })
        })?;

        if line.trim() != expected {
            return Err(Box::new(Error::BadSectionKeyword {
                path: self.path.into(),
                line_no,
                expected: expected.into(),
                found: line.into(),
            }));
        }

        Ok(())
    }

    fn rows(&mut self, section: &str, declared: usize) -> Result<Vec<(usize, Vec<&'a str>)>> {
        let mut rows = Vec::with_capacity(declared);
        for _ in 0..declared {
            let Some((line_no, line)) = self.next_line() else {
                return Err(Box::new(Error::RowCountMismatch {
                    path: self.path.into(),
                    section: section.into(),
                    declared,
                    actual: rows.len(),
                }));
            };
            rows.push((line_no, line.split_whitespace().collect()));
        }
        Ok(rows)
    }
}

fn bad_row(path: &str, line_no: usize, section: &str, line: &str, reason: impl Into<String>) -> Box<Error> {
    Box::new(Error::BadRow {
        path: path.into(),
        line_no,
        section: section.into(),
        line: line.into(),
        reason: reason.into(),
    })
}

fn parse_field<T: std::str::FromStr>(
    path: &str,
    line_no: usize,
    section: &str,
    line: &str,
    field: &str,
) -> Result<T> {
    field
        .parse()
        .map_err(|_| bad_row(path, line_no, section, line, format!("could not parse {field:?}")))
}

pub fn parse(path: &Path) -> Result<Problem> {
    let path_str = path.to_string_lossy().into_owned();
    let text = fs::read_to_string(path).map_err(|io_error| {
        Box::new(Error::FailedToReadInstance {
            path: path_str.clone(),
            io_error,
        })
    })?;

    parse_str(&path_str, &text)
}

fn parse_str(path: &str, text: &str) -> Result<Problem> {
    let mut lines = Lines::new(path, text);

    let name = lines.name_header("Name")?;
    let num_courses = lines.header("Courses")? as usize;
    let num_rooms = lines.header("Rooms")? as usize;
    let days = lines.header("Days")? as u16;
    let periods_per_day = lines.header("Periods_per_day")? as u16;
    let num_curricula = lines.header("Curricula")? as usize;
    let num_unavailability = lines.header("Constraints")? as usize;

    lines.section_keyword("COURSES:")?;
    let course_rows = lines.rows("COURSES", num_courses)?;

    let mut courses = Vec::with_capacity(num_courses);
    let mut course_index_by_name = HashMap::with_capacity(num_courses);
    let mut teacher_index_by_name: HashMap<String, TeacherId> = HashMap::new();
    let mut teachers = Vec::new();

    for (line_no, fields) in &course_rows {
        let line = fields.join(" ");
        let &[course_name, teacher_name, lectures, min_days, students, room_type] = fields.as_slice() else {
            return Err(bad_row(path, *line_no, "COURSES", &line, "expected 6 fields"));
        };

        let teacher_id = *teacher_index_by_name
            .entry(teacher_name.to_string())
            .or_insert_with(|| {
                let id = TeacherId::from_index(teachers.len());
                teachers.push(Teacher { name: teacher_name.to_string() });
                id
            });

        let course_id = CourseId::from_index(courses.len());
        course_index_by_name.insert(course_name.to_string(), course_id);

        courses.push(Course {
            name: course_name.to_string(),
            teacher_id,
            lecture_count: parse_field(path, *line_no, "COURSES", &line, lectures)?,
            min_days: parse_field(path, *line_no, "COURSES", &line, min_days)?,
            student_count: parse_field(path, *line_no, "COURSES", &line, students)?,
            required_room_type: parse_field(path, *line_no, "COURSES", &line, room_type)?,
            curricula: Vec::new(),
        });
    }

    lines.section_keyword("ROOMS:")?;
    let room_rows = lines.rows("ROOMS", num_rooms)?;
    let mut rooms = Vec::with_capacity(num_rooms);
    for (line_no, fields) in &room_rows {
        let line = fields.join(" ");
        let &[room_name, capacity, room_type] = fields.as_slice() else {
            return Err(bad_row(path, *line_no, "ROOMS", &line, "expected 3 fields"));
        };
        rooms.push(Room {
            name: room_name.to_string(),
            capacity: parse_field(path, *line_no, "ROOMS", &line, capacity)?,
            room_type: parse_field(path, *line_no, "ROOMS", &line, room_type)?,
        });
    }

    lines.section_keyword("CURRICULA:")?;
    let curriculum_rows = lines.rows("CURRICULA", num_curricula)?;
    let mut curricula = Vec::with_capacity(num_curricula);
    for (line_no, fields) in &curriculum_rows {
        let line = fields.join(" ");
        let &[curriculum_name, count, ref rest @ ..] = fields.as_slice() else {
            return Err(bad_row(path, *line_no, "CURRICULA", &line, "expected at least 2 fields"));
        };
        let count: usize = parse_field(path, *line_no, "CURRICULA", &line, count)?;
        if rest.len() != count {
            return Err(bad_row(
                path,
                *line_no,
                "CURRICULA",
                &line,
                format!("declared {count} member courses but found {}", rest.len()),
            ));
        }

        let curriculum_id = CurriculumId::from_index(curricula.len());
        let mut course_ids = Vec::with_capacity(count);
        for course_token in rest {
            let course_id = *course_index_by_name.get(*course_token).ok_or_else(|| {
                Box::new(Error::UnknownCourseReference {
                    path: path.into(),
                    curriculum: curriculum_name.to_string(),
                    course_token: course_token.to_string(),
                })
            })?;
            course_ids.push(course_id);
            courses[course_id.raw_index()].curricula.push(curriculum_id);
        }

        curricula.push(Curriculum {
            name: curriculum_name.to_string(),
            course_ids,
        });
    }

    lines.section_keyword("UNAVAILABILITY_CONSTRAINTS:")?;
    let unavailability_rows = lines.rows("UNAVAILABILITY_CONSTRAINTS", num_unavailability)?;
    let mut unavailability_entries = Vec::with_capacity(num_unavailability);
    for (line_no, fields) in &unavailability_rows {
        let line = fields.join(" ");
        let &[course_token, day, period] = fields.as_slice() else {
            return Err(bad_row(path, *line_no, "UNAVAILABILITY_CONSTRAINTS", &line, "expected 3 fields"));
        };

        let course_id = *course_index_by_name.get(course_token).ok_or_else(|| {
            Box::new(Error::UnknownCourseReference {
                path: path.into(),
                curriculum: "<unavailability>".into(),
                course_token: course_token.to_string(),
            })
        })?;

        let day: u16 = parse_field(path, *line_no, "UNAVAILABILITY_CONSTRAINTS", &line, day)?;
        let period: u16 = parse_field(path, *line_no, "UNAVAILABILITY_CONSTRAINTS", &line, period)?;

        if day >= days || period >= periods_per_day {
            return Err(Box::new(Error::UnavailabilityOutOfRange {
                path: path.into(),
                line_no: *line_no,
                course: course_token.to_string(),
                day,
                period,
                days,
                periods_per_day,
            }));
        }

        unavailability_entries.push((course_id, day, period));
    }

    if rooms.is_empty() || courses.is_empty() || days == 0 || periods_per_day == 0 {
        return Err(Box::new(Error::EmptyInstance { path: path.into() }));
    }

    Ok(Problem {
        name,
        days,
        periods_per_day,
        rooms,
        teachers,
        courses,
        curricula,
        unavailability: UnavailabilityTable::build(num_courses, unavailability_entries),
    })
}

/// Writes `problem` back out in the grammar `parse` reads, one section per
/// blank-free block in declaration order. Round-tripping through
/// `write_instance` then `parse_str` yields an equal `Problem`.
pub fn write_instance(problem: &Problem) -> String {
    let unavailability: Vec<(CourseId, u16, u16)> = problem.unavailability.iter().collect();

    let mut out = String::new();
    writeln!(out, "Name: {}", problem.name).unwrap();
    writeln!(out, "Courses: {}", problem.courses.len()).unwrap();
    writeln!(out, "Rooms: {}", problem.rooms.len()).unwrap();
    writeln!(out, "Days: {}", problem.days).unwrap();
    writeln!(out, "Periods_per_day: {}", problem.periods_per_day).unwrap();
    writeln!(out, "Curricula: {}", problem.curricula.len()).unwrap();
    writeln!(out, "Constraints: {}", unavailability.len()).unwrap();

    writeln!(out, "COURSES:").unwrap();
    for course in &problem.courses {
        writeln!(
            out,
            "{} {} {} {} {} {}",
            course.name,
            problem.teacher(course.teacher_id).name,
            course.lecture_count,
            course.min_days,
            course.student_count,
            course.required_room_type,
        )
        .unwrap();
    }

    writeln!(out, "ROOMS:").unwrap();
    for room in &problem.rooms {
        writeln!(out, "{} {} {}", room.name, room.capacity, room.room_type).unwrap();
    }

    writeln!(out, "CURRICULA:").unwrap();
    for curriculum in &problem.curricula {
        let members: Vec<&str> = curriculum
            .course_ids
            .iter()
            .map(|&id| problem.course(id).name.as_str())
            .collect();
        writeln!(
            out,
            "{} {} {}",
            curriculum.name,
            members.len(),
            members.join(" "),
        )
        .unwrap();
    }

    writeln!(out, "UNAVAILABILITY_CONSTRAINTS:").unwrap();
    for (course_id, day, period) in unavailability {
        writeln!(out, "{} {} {}", problem.course(course_id).name, day, period).unwrap();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_INSTANCE: &str = "\
Name: toy
Courses: 2
Rooms: 1
Days: 2
Periods_per_day: 1
Curricula: 1
Constraints: 1
COURSES:
c1 t1 1 1 10 1
c2 t2 1 1 10 1
ROOMS:
r1 20 1
CURRICULA:
k1 2 c1 c2
UNAVAILABILITY_CONSTRAINTS:
c1 0 0
";

    #[test]
    fn parses_a_small_instance() {
        let problem = parse_str("toy.txt", SMALL_INSTANCE).unwrap();
        assert_eq!(problem.name, "toy");
        assert_eq!(problem.courses.len(), 2);
        assert_eq!(problem.rooms.len(), 1);
        assert_eq!(problem.teachers.len(), 2);
        assert_eq!(problem.curricula.len(), 1);
        assert_eq!(problem.curricula[0].course_ids.len(), 2);
        assert!(problem.is_unavailable(CourseId::from_index(0), crate::problem::PeriodId::from_index(0)));
    }

    #[test]
    fn interns_shared_teachers_in_first_seen_order() {
        let text = SMALL_INSTANCE.replace("t2", "t1");
        let problem = parse_str("toy.txt", &text).unwrap();
        assert_eq!(problem.teachers.len(), 1);
        assert_eq!(problem.courses[0].teacher_id, problem.courses[1].teacher_id);
    }

    #[test]
    fn rejects_unknown_course_reference_in_curricula() {
        let text = SMALL_INSTANCE.replace("c1 c2", "c1 nope");
        let err = parse_str("toy.txt", &text).unwrap_err();
        assert!(matches!(*err, Error::UnknownCourseReference { .. }));
    }

    #[test]
    fn rejects_unavailability_out_of_range() {
        let text = SMALL_INSTANCE.replace("c1 0 0", "c1 5 0");
        let err = parse_str("toy.txt", &text).unwrap_err();
        assert!(matches!(*err, Error::UnavailabilityOutOfRange { .. }));
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let text = SMALL_INSTANCE.replace("Courses: 2", "Courses: 50");
        let err = parse_str("toy.txt", &text).unwrap_err();
        assert!(matches!(*err, Error::RowCountMismatch { .. }));
    }

    #[test]
    fn writing_then_reparsing_yields_an_equal_problem() {
        let problem = parse_str("toy.txt", SMALL_INSTANCE).unwrap();
        let rewritten = write_instance(&problem);
        let reparsed = parse_str("toy.txt", &rewritten).unwrap();
        assert_eq!(problem, reparsed);
    }

    #[test]
    fn write_instance_round_trips_an_instance_with_no_unavailability() {
        let text = SMALL_INSTANCE.replace("Constraints: 1", "Constraints: 0").replace("c1 0 0\n", "");
        let problem = parse_str("toy.txt", &text).unwrap();
        let rewritten = write_instance(&problem);
        let reparsed = parse_str("toy.txt", &rewritten).unwrap();
        assert_eq!(problem, reparsed);
    }
}
