//! The Simulated Annealing driver: cooling schedule, acceptance rule,
//! re-heating, stagnation cap and best-so-far tracking.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::time::Instant;

use crate::evaluator::{Evaluator, TeacherDaySeed};
use crate::mutation;
use crate::problem::Problem;
use crate::solution::{copy_into, Solution};
use crate::utils::{amplified_delta, indent_lines};

/// One row of the temperature-adaptive cooling table.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleEntry {
    pub threshold: f64,
    pub max_iter: u32,
    pub alpha: f64,
}

pub const DEFAULT_SCHEDULE: [ScheduleEntry; 6] = [
    ScheduleEntry { threshold: 1000.0, max_iter: 600, alpha: 0.98 },
    ScheduleEntry { threshold: 100.0, max_iter: 800, alpha: 0.97 },
    ScheduleEntry { threshold: 10.0, max_iter: 1000, alpha: 0.98 },
    ScheduleEntry { threshold: 1.0, max_iter: 1200, alpha: 0.99 },
    ScheduleEntry { threshold: 0.1, max_iter: 1500, alpha: 0.993 },
    ScheduleEntry { threshold: f64::NEG_INFINITY, max_iter: 1200, alpha: 0.995 },
];

fn schedule_row(schedule: &[ScheduleEntry], temperature: f64) -> ScheduleEntry {
    schedule
        .iter()
        .copied()
        .find(|row| temperature > row.threshold)
        .unwrap_or(*schedule.last().expect("schedule has at least one row"))
}

#[derive(Debug, Clone, Copy)]
pub struct SolverParams {
    pub t_initial: f64,
    pub t_final: f64,
    pub reheat_factor: f64,
    pub reheat_reset_fraction: f64,
    pub stagnation_cap: u32,
    pub delta_amplification: i64,
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            t_initial: 1e6,
            t_final: 1e-5,
            reheat_factor: 10.0,
            reheat_reset_fraction: 0.1,
            stagnation_cap: 8000,
            delta_amplification: 4,
        }
    }
}

/// One `(wall_time_ms, fo)` entry appended every time `best` improves; the
/// ring keeps only the most recent ten.
pub type HistoryRing = VecDeque<(u64, i64)>;
const HISTORY_CAPACITY: usize = 10;

pub struct AnnealOutput {
    pub best: Solution,
    pub history: HistoryRing,
    pub log: String,
    pub outer_iterations: u64,
}

/// Runs the full outer/inner annealing loop starting from `initial`.
/// `seed_r9` carries a phase-1 teacher-day occupancy bitmap into the
/// evaluator, or `None` for a first-phase (unseeded) run. `rng` is the
/// single process-wide stream threaded down from `main`, not re-seeded here.
pub fn anneal(
    problem: &Problem,
    initial: Solution,
    params: SolverParams,
    schedule: &[ScheduleEntry],
    seed_r9: Option<TeacherDaySeed>,
    rng: &mut fastrand::Rng,
) -> AnnealOutput {
    let mut log = String::new();

    macro_rules! logln {
        ( $( $args:expr ),* ) => {{
            writeln!(&mut log, $( $args ),* ).unwrap();
        }};
    }

    let start_time = Instant::now();

    let mut evaluator = Evaluator::new(problem);
    evaluator.set_seed_r9(seed_r9);

    let mut current = initial;
    current.fo = evaluator.evaluate(problem, &current);

    let mut best = current.clone();
    let mut neighbor = current.clone();

    logln!("initial objective: {}", current.fo);

    let mut temperature = params.t_initial;
    let mut history: HistoryRing = VecDeque::with_capacity(HISTORY_CAPACITY);
    let mut stagnation = 0u32;
    let mut reheated = false;
    let mut outer_iterations = 0u64;

    while temperature > params.t_final && best.fo != 0 && stagnation < params.stagnation_cap {
        let row = schedule_row(schedule, temperature);

        for _ in 0..row.max_iter {
            copy_into(&mut neighbor, &current);

            if temperature < 100.0 {
                evaluator.evaluate(problem, &neighbor);
            }

            mutation::mutate(problem, &mut neighbor, &mut evaluator, temperature, rng);
            neighbor.fo = evaluator.evaluate(problem, &neighbor);

            let delta = amplified_delta(neighbor.fo, current.fo, params.delta_amplification);

            let accept = if delta < 0 {
                true
            } else {
                rng.f64() < (-(delta as f64) / temperature).exp()
            };

            if accept {
                copy_into(&mut current, &neighbor);

                if current.fo < best.fo {
                    copy_into(&mut best, &current);
                    stagnation = 0;
                    if history.len() == HISTORY_CAPACITY {
                        history.pop_front();
                    }
                    history.push_back((start_time.elapsed().as_millis() as u64, best.fo));
                }
            }
        }

        outer_iterations += 1;
        stagnation += 1;

        if outer_iterations % 100 == 0 {
            println!(
                "outer {outer_iterations}: T = {temperature:.4}, current.fo = {}, best.fo = {}",
                current.fo, best.fo
            );
        }

        if !reheated && temperature <= params.reheat_factor * params.t_final {
            temperature = params.reheat_reset_fraction * params.t_initial;
            reheated = true;
            logln!("re-heating to {temperature} at outer iteration {outer_iterations}");
        } else {
            temperature *= row.alpha;
        }
    }

    logln!(
        "\nfinal objective: {}\n{}",
        best.fo,
        indent_lines(&format!("{:?}", evaluator.violations()), 4)
    );
    logln!("solving took {:.3} seconds", start_time.elapsed().as_secs_f32());

    AnnealOutput {
        best,
        history,
        log,
        outer_iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initial_solution::initial_construct;
    use crate::problem::{Course, Room, Teacher, UnavailabilityTable};

    fn trivial_problem() -> Problem {
        Problem {
            name: "s1".into(),
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
    fn schedule_row_picks_the_first_threshold_the_temperature_clears() {
        let row = schedule_row(&DEFAULT_SCHEDULE, 5000.0);
        assert_eq!(row.max_iter, 600);

        let row = schedule_row(&DEFAULT_SCHEDULE, 0.01);
        assert_eq!(row.max_iter, 1200);
        assert_eq!(row.alpha, 0.995);
    }

    #[test]
    fn anneal_reaches_zero_on_a_trivially_satisfiable_instance() {
        let problem = trivial_problem();
        let mut rng = fastrand::Rng::with_seed(1);
        let initial = initial_construct(&problem, &mut rng);

        let params = SolverParams {
            stagnation_cap: 50,
            ..SolverParams::default()
        };
        let output = anneal(&problem, initial, params, &DEFAULT_SCHEDULE, None, &mut rng);

        assert_eq!(output.best.fo, 0);
    }

    #[test]
    fn anneal_never_lets_best_regress() {
        let problem = trivial_problem();
        let mut rng = fastrand::Rng::with_seed(2);
        let initial = initial_construct(&problem, &mut rng);

        let params = SolverParams {
            stagnation_cap: 20,
            ..SolverParams::default()
        };
        let output = anneal(&problem, initial, params, &DEFAULT_SCHEDULE, None, &mut rng);

        let mut last = i64::MAX;
        for &(_, fo) in &output.history {
            assert!(fo <= last);
            last = fo;
        }
    }
}
