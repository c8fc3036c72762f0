//! Two-phase composition: phase 2 inherits phase 1's teacher-day occupancy
//! as a seed for its R9 (teacher weekly-day spread) soft constraint.

use crate::evaluator::{Evaluator, TeacherDaySeed, Violations};
use crate::initial_solution::initial_construct;
use crate::problem::Problem;
use crate::solver::{anneal, AnnealOutput, ScheduleEntry, SolverParams};

pub struct PhaseOutput {
    pub anneal: AnnealOutput,
    /// Violations of `anneal.best`, recomputed after the run so callers
    /// (the report writer) don't need their own `Evaluator`.
    pub violations: Violations,
}

/// Builds an engine for `problem`, runs it to completion, and returns the
/// result. `seed_r9` is `None` for phase 1, `Some` for phase 2. `rng` is the
/// single process-wide stream shared across both phases, not re-seeded here.
pub fn run_phase(
    problem: &Problem,
    params: SolverParams,
    schedule: &[ScheduleEntry],
    seed_r9: Option<TeacherDaySeed>,
    rng: &mut fastrand::Rng,
) -> PhaseOutput {
    let initial = initial_construct(problem, rng);

    let anneal = anneal(problem, initial, params, schedule, seed_r9.clone(), rng);

    let mut final_evaluator = Evaluator::new(problem);
    final_evaluator.set_seed_r9(seed_r9);
    final_evaluator.evaluate(problem, &anneal.best);

    PhaseOutput {
        anneal,
        violations: *final_evaluator.violations(),
    }
}

/// Runs phase 1 unseeded, extracts its teacher-day occupancy, then runs
/// phase 2 seeded with it. Phase 1's evaluator and buffers are dropped
/// before phase 2 allocates its own, per the one-engine-per-phase lifecycle.
/// Both phases draw from the same `rng` stream, in sequence.
pub fn run_two_phase(
    problem_1: &Problem,
    problem_2: &Problem,
    params: SolverParams,
    schedule: &[ScheduleEntry],
    rng: &mut fastrand::Rng,
) -> (PhaseOutput, PhaseOutput) {
    let phase_1 = run_phase(problem_1, params, schedule, None, rng);
    let seed = TeacherDaySeed::from_solution(problem_1, &phase_1.anneal.best);

    let phase_2 = run_phase(problem_2, params, schedule, Some(seed), rng);

    (phase_1, phase_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Course, Room, Teacher, UnavailabilityTable};

    fn single_lecture_problem(name: &str) -> Problem {
        Problem {
            name: name.into(),
            days: 1,
            periods_per_day: 1,
            rooms: vec![Room { name: "R0".into(), capacity: 1, room_type: 1 }],
            teachers: vec![Teacher { name: "T0".into() }],
            courses: vec![Course {
                name: "C0".into(),
                teacher_id: crate::problem::TeacherId::from_index(0),
                lecture_count: 1,
                min_days: 1,
                student_count: 1,
                required_room_type: 1,
                curricula: vec![],
            }],
            curricula: vec![],
            unavailability: UnavailabilityTable::build(1, vec![]),
        }
    }

    #[test]
    fn two_phase_run_completes_both_phases() {
        let problem_1 = single_lecture_problem("p1");
        let problem_2 = single_lecture_problem("p2");
        let params = SolverParams {
            stagnation_cap: 20,
            ..SolverParams::default()
        };
        let mut rng = fastrand::Rng::with_seed(1);

        let (phase_1, phase_2) = run_two_phase(
            &problem_1,
            &problem_2,
            params,
            &crate::solver::DEFAULT_SCHEDULE,
            &mut rng,
        );

        assert_eq!(phase_1.anneal.best.fo, 0);
        assert_eq!(phase_2.anneal.best.fo, 0);
        assert_eq!(phase_1.violations, Violations::default());
        assert_eq!(phase_2.violations, Violations::default());
    }
}
