//! Human-readable report, standalone grid dump and a minimal JSON sidecar.
//! One call per phase; the CLI writes `<out_dir>/<instance>.{txt,grid,json}`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::evaluator::Violations;
use crate::problem::{PeriodId, Problem, RoomId};
use crate::solution::Solution;
use crate::solver::HistoryRing;
use crate::utils::indent_lines;

/// `total_periods` rows of tab-separated room columns; each cell is a course
/// name or `-`. Used both inside the narrative report and as the standalone
/// `.grid` artifact.
pub fn grid_text(problem: &Problem, solution: &Solution) -> String {
    let mut out = String::new();
    for period_idx in 0..problem.total_periods() {
        let period = PeriodId::from_index(period_idx);
        let row: Vec<&str> = (0..problem.num_rooms())
            .map(|room_idx| {
                let room = RoomId::from_index(room_idx);
                match solution.get(period, room) {
                    Some(course) => problem.course(course).name.as_str(),
                    None => "-",
                }
            })
            .collect();
        writeln!(out, "{}", row.join("\t")).unwrap();
    }
    out
}

fn violation_breakdown(violations: &Violations) -> String {
    let mut out = String::new();
    writeln!(out, "r1  (lecture count off target):  {}", violations.r1).unwrap();
    writeln!(out, "r2t (teacher double-booked):      {}", violations.r2_teacher).unwrap();
    writeln!(out, "r2k (curriculum double-booked):   {}", violations.r2_curriculum).unwrap();
    writeln!(out, "r4  (teacher unavailable):        {}", violations.r4).unwrap();
    writeln!(out, "r5  (under minimum working days): {}", violations.r5).unwrap();
    writeln!(out, "r6  (isolated curriculum lecture):{}", violations.r6).unwrap();
    writeln!(out, "r7  (room capacity exceeded):     {}", violations.r7).unwrap();
    writeln!(out, "r8  (room instability):           {}", violations.r8).unwrap();
    writeln!(out, "r9  (teacher weekly day spread):  {}", violations.r9).unwrap();
    writeln!(out, "r10 (room type mismatch):         {}", violations.r10).unwrap();
    writeln!(out, "r11 (same course same day twice): {}", violations.r11).unwrap();
    out
}

/// The full narrative report: instance metadata, objective, per-constraint
/// counts, instance dumps, the grid render and the solver's in-memory log.
pub fn report_text(
    problem: &Problem,
    solution: &Solution,
    violations: &Violations,
    history: &HistoryRing,
    log: &str,
) -> String {
    let mut out = String::new();

    writeln!(out, "instance: {}", problem.name).unwrap();
    writeln!(
        out,
        "days: {}, periods_per_day: {}, rooms: {}, teachers: {}, courses: {}, curricula: {}",
        problem.days,
        problem.periods_per_day,
        problem.rooms.len(),
        problem.teachers.len(),
        problem.courses.len(),
        problem.curricula.len(),
    )
    .unwrap();

    writeln!(out, "\nobjective: {}", solution.fo).unwrap();

    out.push_str("\nviolations:\n");
    out.push_str(&indent_lines(&violation_breakdown(violations), 4));

    out.push_str("\ncourses:\n");
    out.push_str(&indent_lines(&format!("{:#?}", problem.courses), 4));

    out.push_str("\nrooms:\n");
    out.push_str(&indent_lines(&format!("{:#?}", problem.rooms), 4));

    out.push_str("\ncurricula:\n");
    out.push_str(&indent_lines(&format!("{:#?}", problem.curricula), 4));

    out.push_str("\ntimetable:\n");
    out.push_str(&indent_lines(&grid_text(problem, solution), 4));

    out.push_str("\nbest-improvement history (time_ms, fo):\n");
    for &(time_ms, fo) in history {
        writeln!(out, "    {time_ms}ms -> {fo}").unwrap();
    }

    out.push_str("\nsolver log:\n");
    out.push_str(&indent_lines(log, 4));

    out
}

/// Minimal machine-readable companion: just enough to script over without
/// re-parsing the narrative report.
#[derive(Debug, Serialize)]
pub struct ReportJson {
    pub instance: String,
    pub fo: i64,
    pub violations: Violations,
}

pub fn report_json(problem: &Problem, solution: &Solution, violations: &Violations) -> ReportJson {
    ReportJson {
        instance: problem.name.clone(),
        fo: solution.fo,
        violations: *violations,
    }
}

/// Writes `<out_dir>/<instance>.txt`, `.grid` and `.json`, creating `out_dir`
/// if needed.
pub fn write_phase_report(
    out_dir: &Path,
    problem: &Problem,
    solution: &Solution,
    violations: &Violations,
    history: &HistoryRing,
    log: &str,
) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    let txt_path = out_dir.join(format!("{}.txt", problem.name));
    fs::write(&txt_path, report_text(problem, solution, violations, history, log))
        .with_context(|| format!("failed to write {}", txt_path.display()))?;

    let grid_path = out_dir.join(format!("{}.grid", problem.name));
    fs::write(&grid_path, grid_text(problem, solution))
        .with_context(|| format!("failed to write {}", grid_path.display()))?;

    let json_path = out_dir.join(format!("{}.json", problem.name));
    let json = serde_json::to_string_pretty(&report_json(problem, solution, violations))
        .context("failed to serialize report.json")?;
    fs::write(&json_path, json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Course, CourseId, Room, Teacher, TeacherId, UnavailabilityTable};

    fn tiny_problem() -> Problem {
        Problem {
            name: "toy".into(),
            days: 1,
            periods_per_day: 2,
            rooms: vec![Room { name: "R0".into(), capacity: 30, room_type: 1 }],
            teachers: vec![Teacher { name: "T0".into() }],
            courses: vec![Course {
                name: "C0".into(),
                teacher_id: TeacherId::from_index(0),
                lecture_count: 1,
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
    fn grid_text_has_one_row_per_period_and_one_column_per_room() {
        let problem = tiny_problem();
        let mut solution = Solution::new_empty(&problem);
        solution.set(PeriodId::from_index(0), RoomId::from_index(0), Some(CourseId::from_index(0)));

        let text = grid_text(&problem, &solution);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), problem.total_periods());
        assert_eq!(lines[0], "C0");
        assert_eq!(lines[1], "-");
    }

    #[test]
    fn report_text_includes_instance_name_and_objective() {
        let problem = tiny_problem();
        let mut solution = Solution::new_empty(&problem);
        solution.fo = 42;
        let violations = Violations::default();
        let history = HistoryRing::new();

        let text = report_text(&problem, &solution, &violations, &history, "log line\n");
        assert!(text.contains("instance: toy"));
        assert!(text.contains("objective: 42"));
        assert!(text.contains("log line"));
    }

    #[test]
    fn report_json_mirrors_solution_fo_and_violations() {
        let problem = tiny_problem();
        let mut solution = Solution::new_empty(&problem);
        solution.fo = 7;
        let mut violations = Violations::default();
        violations.r9 = 3;

        let json = report_json(&problem, &solution, &violations);
        assert_eq!(json.instance, "toy");
        assert_eq!(json.fo, 7);
        assert_eq!(json.violations.r9, 3);
    }
}
