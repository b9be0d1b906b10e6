use std::collections::BTreeMap;

use crate::error::{AssignmentError, AssignmentResult};
use crate::experiment::Assignment;

use super::ast::{Node, OpKind, Program, PureOp};
use super::ops::{Args, apply_pure, random_op};
use super::value::{Params, Value};

/// Recursive evaluator for assignment programs.
///
/// Reads resolve against params first, then inputs. Writes go to the borrowed
/// [`Assignment`], so a pass over a program leaves its params there.
pub struct Interpreter<'a> {
    inputs: &'a Params,
    assignment: &'a mut Assignment,
    returned: bool,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter writing into `assignment`.
    pub fn new(assignment: &'a mut Assignment, inputs: &'a Params) -> Self {
        Self {
            inputs,
            assignment,
            returned: false,
        }
    }

    /// Run a whole program.
    pub fn run(&mut self, program: &Program) -> AssignmentResult<Value> {
        self.evaluate(&program.root)
    }

    /// Whether a `return` statement stopped execution.
    pub fn returned(&self) -> bool {
        self.returned
    }

    /// Evaluate one node.
    pub fn evaluate(&mut self, node: &Node) -> AssignmentResult<Value> {
        match node {
            Node::Literal(value) => Ok(value.clone()),
            Node::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item)?);
                }
                Ok(Value::List(values))
            }
            Node::Get(var) => self.lookup(var),
            Node::Set { var, value } => {
                let result = match value.as_ref() {
                    Node::Operator {
                        kind: OpKind::Random(kind),
                        args,
                    } => {
                        tracing::trace!(op = kind.name(), var = %var, "evaluating operator");
                        let args = self.evaluate_args(kind.name(), args)?;
                        let op = random_op(*kind, args)?;
                        self.assignment.evaluate_random(&op, Some(var.as_str()))?
                    }
                    other => self.evaluate(other)?,
                };
                self.assignment.set(var.clone(), result.clone());
                Ok(result)
            }
            Node::Seq(statements) => {
                let mut last = Value::Null;
                for statement in statements {
                    last = self.evaluate(statement)?;
                    if self.returned {
                        break;
                    }
                }
                Ok(last)
            }
            Node::Cond {
                branches,
                otherwise,
            } => {
                for branch in branches {
                    if self.evaluate(&branch.when)?.is_truthy() {
                        return self.evaluate(&branch.then);
                    }
                    if self.returned {
                        return Ok(Value::Null);
                    }
                }
                match otherwise {
                    Some(block) => self.evaluate(block),
                    None => Ok(Value::Null),
                }
            }
            Node::Return(value) => {
                let value = self.evaluate(value)?;
                self.assignment.set_in_experiment(value.is_truthy());
                self.returned = true;
                Ok(value)
            }
            Node::Operator { kind, args } => self.evaluate_operator(*kind, args),
        }
    }

    fn lookup(&self, var: &str) -> AssignmentResult<Value> {
        self.assignment
            .get(var)
            .or_else(|| self.inputs.get(var))
            .cloned()
            .ok_or_else(|| AssignmentError::UndefinedVariable(var.to_string()))
    }

    fn evaluate_operator(
        &mut self,
        kind: OpKind,
        args: &BTreeMap<String, Node>,
    ) -> AssignmentResult<Value> {
        tracing::trace!(op = kind.name(), "evaluating operator");
        match kind {
            OpKind::Random(random) => {
                let args = self.evaluate_args(random.name(), args)?;
                let op = random_op(random, args)?;
                self.assignment.evaluate_random(&op, None)
            }
            OpKind::Pure(op @ (PureOp::And | PureOp::Or)) => match args.get("values") {
                Some(Node::List(items)) => self.short_circuit(op, items),
                _ => {
                    let args = self.evaluate_args(op.name(), args)?;
                    apply_pure(op, args)
                }
            },
            OpKind::Pure(op) => {
                let args = self.evaluate_args(op.name(), args)?;
                apply_pure(op, args)
            }
        }
    }

    fn short_circuit(&mut self, op: PureOp, items: &[Node]) -> AssignmentResult<Value> {
        let stop_on = op == PureOp::Or;
        for item in items {
            if self.evaluate(item)?.is_truthy() == stop_on {
                return Ok(Value::Boolean(stop_on));
            }
        }
        Ok(Value::Boolean(!stop_on))
    }

    fn evaluate_args(
        &mut self,
        op: &'static str,
        args: &BTreeMap<String, Node>,
    ) -> AssignmentResult<Args> {
        let mut values = BTreeMap::new();
        for (name, node) in args {
            values.insert(name.clone(), self.evaluate(node)?);
        }
        Ok(Args::new(op, values))
    }
}

/// Outcome of running a program in isolation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Params produced by the program.
    pub params: Params,
    /// False when the program returned a falsy value.
    pub in_experiment: bool,
}

/// Evaluate `program` against `inputs` under `experiment_salt`.
pub fn evaluate_program(
    program: &Program,
    experiment_salt: &str,
    inputs: &Params,
) -> AssignmentResult<Evaluation> {
    let mut assignment = Assignment::new(experiment_salt);
    Interpreter::new(&mut assignment, inputs).run(program)?;
    Ok(Evaluation {
        in_experiment: assignment.in_experiment(),
        params: assignment.into_params(),
    })
}
