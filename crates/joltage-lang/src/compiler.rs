use joltage_solver::{IlpProblem, LightsPuzzle};
use thiserror::Error;

use crate::ast::*;

/// Largest joltage target accepted. Sums over a machine stay far from
/// `i64::MAX`, and every target is exact as an `f64`.
pub const MAX_TARGET: i64 = 1 << 40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Machine {machine}: button {button} references counter {counter}, but only {counters} counters exist")]
    CounterOutOfRange {
        machine: usize,
        button: usize,
        counter: usize,
        counters: usize,
    },
    #[error("Machine {machine}: counter {counter} target {target} exceeds the limit of {}", MAX_TARGET)]
    TargetTooLarge { machine: usize, counter: usize, target: i64 },
    #[error("Machine {0}: empty joltage block")]
    EmptyJoltages(usize),
    #[error("Machine {machine}: {width} lights exceed the limit of 64")]
    TooManyLights { machine: usize, width: usize },
    #[error("Machine {machine}: button {button} toggles light {light}, but the diagram has {width} lights")]
    LightOutOfRange {
        machine: usize,
        button: usize,
        light: usize,
        width: usize,
    },
    #[error("Machine {0} has no light diagram")]
    MissingLights(usize),
}

/// A machine lowered to solver inputs
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMachine {
    /// Position of the machine in the source, counted from zero
    pub index: usize,
    /// One equality row per counter, one variable per button
    pub problem: IlpProblem,
    pub lights: Option<LightsPuzzle>,
}

impl CompiledMachine {
    pub fn lights_puzzle(&self) -> Result<&LightsPuzzle, CompileError> {
        self.lights.as_ref().ok_or(CompileError::MissingLights(self.index))
    }
}

/// Compiler for converting machine descriptions to solver inputs
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    require_lights: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject machines without a light diagram.
    pub fn with_required_lights(mut self, require_lights: bool) -> Self {
        self.require_lights = require_lights;
        self
    }

    pub fn compile_program(&self, program: &Program) -> Result<Vec<CompiledMachine>, CompileError> {
        program
            .machines
            .iter()
            .enumerate()
            .map(|(index, machine)| self.compile(index, machine))
            .collect()
    }

    pub fn compile(&self, index: usize, machine: &Machine) -> Result<CompiledMachine, CompileError> {
        let counters = machine.joltages.len();
        if counters == 0 {
            return Err(CompileError::EmptyJoltages(index));
        }
        if let Some((counter, &target)) = machine.joltages.iter().enumerate().find(|(_, t)| **t > MAX_TARGET) {
            return Err(CompileError::TargetTooLarge {
                machine: index,
                counter,
                target,
            });
        }

        for (b, button) in machine.buttons.iter().enumerate() {
            if let Some(&counter) = button.counters.iter().find(|&&c| c >= counters) {
                return Err(CompileError::CounterOutOfRange {
                    machine: index,
                    button: b,
                    counter,
                    counters,
                });
            }
        }

        let mut problem = IlpProblem::new(machine.buttons.len());
        for (counter, &target) in machine.joltages.iter().enumerate() {
            let touching: Vec<usize> = machine
                .buttons
                .iter()
                .enumerate()
                .filter(|(_, button)| button.counters.contains(&counter))
                .map(|(b, _)| b)
                .collect();
            problem.add_index_constraint(format!("counter{}", counter), &touching, target);
        }

        let lights = match &machine.lights {
            Some(diagram) => Some(self.compile_lights(index, diagram, &machine.buttons)?),
            None if self.require_lights => return Err(CompileError::MissingLights(index)),
            None => None,
        };

        Ok(CompiledMachine { index, problem, lights })
    }

    fn compile_lights(&self, index: usize, diagram: &[bool], buttons: &[Button]) -> Result<LightsPuzzle, CompileError> {
        let width = diagram.len();
        if width > 64 {
            return Err(CompileError::TooManyLights { machine: index, width });
        }

        let target = diagram
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .fold(0u64, |mask, (i, _)| mask | (1 << i));

        let masks = buttons
            .iter()
            .enumerate()
            .map(|(b, button)| {
                button.counters.iter().try_fold(0u64, |mask, &light| {
                    if light >= width {
                        Err(CompileError::LightOutOfRange {
                            machine: index,
                            button: b,
                            light,
                            width,
                        })
                    } else {
                        Ok(mask ^ (1 << light))
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LightsPuzzle::new(width, target, masks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parser;
    use joltage_solver::{SolverConfig, solve};

    const EXAMPLE: &str = "\
[.##.] (3) (1,3) (2) (2,3) (0,2) (0,1) {3,5,4,7}
[...#.] (0,2,3,4) (2,3) (0,4) (0,1,2) (1,2,3,4) {7,5,12,7,2}
[.###.#] (0,1,2,3,4) (0,3,4) (0,1,2,4,5) (1,2) {10,11,11,5,10,5}
";

    fn compile(source: &str) -> Result<Vec<CompiledMachine>, CompileError> {
        let program = Parser::parse(source).unwrap();
        Compiler::new().compile_program(&program)
    }

    #[test]
    fn test_compile_rows() {
        let machines = compile("(0) (0,1) {2,1}").unwrap();
        let problem = &machines[0].problem;
        assert_eq!(problem.num_variables(), 2);
        assert_eq!(problem.num_constraints(), 2);
        assert!(problem.is_equality_system());
        assert!(problem.has_unit_costs());
        assert_eq!(problem.constraints[0].name, "counter0");
        assert_eq!(problem.constraints[0].coefficients, vec![1, 1]);
        assert_eq!(problem.constraints[1].coefficients, vec![0, 1]);
        assert_eq!(problem.constraints[1].rhs, 1);
    }

    #[test]
    fn test_compile_and_solve() {
        let machines = compile(EXAMPLE).unwrap();
        let config = SolverConfig::new();
        let minima: Vec<i64> = machines
            .iter()
            .map(|m| solve(&m.problem, &config).unwrap().objective)
            .collect();
        assert_eq!(minima, vec![10, 12, 11]);
        assert_eq!(minima.iter().sum::<i64>(), 33);
    }

    #[test]
    fn test_compile_lights() {
        let machines = compile(EXAMPLE).unwrap();
        let first = machines[0].lights_puzzle().unwrap();
        assert_eq!(first.width, 4);
        assert_eq!(first.target, 0b0110);
        assert_eq!(first.buttons[1], 0b1010);

        let presses: Vec<usize> = machines
            .iter()
            .map(|m| m.lights_puzzle().unwrap().min_presses(usize::MAX).unwrap())
            .collect();
        assert_eq!(presses, vec![2, 3, 2]);
    }

    #[test]
    fn test_counter_out_of_range() {
        let err = compile("(0) (2) {1,1}").unwrap_err();
        assert_eq!(
            err,
            CompileError::CounterOutOfRange {
                machine: 0,
                button: 1,
                counter: 2,
                counters: 2,
            }
        );
    }

    #[test]
    fn test_empty_joltages() {
        let err = compile("(0,1) {3}\n(0) {}").unwrap_err();
        assert_eq!(err, CompileError::EmptyJoltages(1));
    }

    #[test]
    fn test_target_limit() {
        assert!(compile(&format!("(0) {{{}}}", MAX_TARGET)).is_ok());

        let err = compile("(0) (1) {3,9223372036854775807}").unwrap_err();
        assert_eq!(
            err,
            CompileError::TargetTooLarge {
                machine: 0,
                counter: 1,
                target: i64::MAX,
            }
        );
    }

    #[test]
    fn test_light_diagram_limits() {
        let wide = format!("[{}] (0) {{1}}", ".".repeat(65));
        assert!(matches!(compile(&wide), Err(CompileError::TooManyLights { width: 65, .. })));

        let err = compile("[.#] (0,2) {1,1,1}").unwrap_err();
        assert!(matches!(err, CompileError::LightOutOfRange { light: 2, width: 2, .. }));
    }

    #[test]
    fn test_missing_lights() {
        let program = Parser::parse("(0) {1}").unwrap();
        let machines = Compiler::new().compile_program(&program).unwrap();
        assert_eq!(machines[0].lights_puzzle(), Err(CompileError::MissingLights(0)));

        let strict = Compiler::new().with_required_lights(true);
        assert_eq!(strict.compile_program(&program), Err(CompileError::MissingLights(0)));
    }
}
