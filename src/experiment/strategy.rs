use crate::error::AssignmentResult;
use crate::interpreter::{Interpreter, Params, Program};

use super::assignment::Assignment;

/// How an experiment computes its params.
///
/// Implemented by [`Native`] (Rust code) and [`Interpreted`] (a compiled
/// program). Strategies run at most once per experiment instance.
pub trait AssignmentStrategy {
    /// Populate `assignment` from `inputs`.
    fn assign(&mut self, assignment: &mut Assignment, inputs: &Params) -> AssignmentResult<()>;

    /// Identifier of the assignment logic, copied into logged records.
    fn checksum(&self) -> Option<String> {
        None
    }
}

/// Native assignment routine.
///
/// ```
/// use sortition::experiment::{Assignment, Native};
/// use sortition::random::RandomOp;
///
/// let strategy = Native::new(|params: &mut Assignment, inputs: &sortition::Params| {
///     params.draw("foo", RandomOp::uniform_choice(vec!["a", "b"]).unit(inputs["i"].clone()))?;
///     Ok(())
/// });
/// # let _ = strategy;
/// ```
pub struct Native<F> {
    routine: F,
}

impl<F> Native<F>
where
    F: FnMut(&mut Assignment, &Params) -> AssignmentResult<()>,
{
    /// Wrap a routine.
    pub fn new(routine: F) -> Self {
        Self { routine }
    }
}

impl<F> AssignmentStrategy for Native<F>
where
    F: FnMut(&mut Assignment, &Params) -> AssignmentResult<()>,
{
    fn assign(&mut self, assignment: &mut Assignment, inputs: &Params) -> AssignmentResult<()> {
        (self.routine)(assignment, inputs)
    }
}

/// Assignment driven by a compiled program.
#[derive(Debug, Clone)]
pub struct Interpreted {
    program: Program,
    checksum: String,
}

impl Interpreted {
    /// Wrap a program.
    pub fn new(program: Program) -> Self {
        let checksum = program.checksum();
        Self { program, checksum }
    }

    /// Parse a compiled document and wrap it.
    pub fn from_json_str(text: &str) -> AssignmentResult<Self> {
        Program::from_json_str(text).map(Self::new)
    }

    /// The wrapped program.
    pub fn program(&self) -> &Program {
        &self.program
    }
}

impl AssignmentStrategy for Interpreted {
    fn assign(&mut self, assignment: &mut Assignment, inputs: &Params) -> AssignmentResult<()> {
        Interpreter::new(assignment, inputs).run(&self.program)?;
        Ok(())
    }

    fn checksum(&self) -> Option<String> {
        Some(self.checksum.clone())
    }
}

impl<S: AssignmentStrategy + ?Sized> AssignmentStrategy for Box<S> {
    fn assign(&mut self, assignment: &mut Assignment, inputs: &Params) -> AssignmentResult<()> {
        (**self).assign(assignment, inputs)
    }

    fn checksum(&self) -> Option<String> {
        (**self).checksum()
    }
}
