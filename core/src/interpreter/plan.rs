//! Block resolution
//!
//! Scripts are flat step lists where `If`/`Else`/`EndIf` and
//! `While`/`EndWhile` markers delimit blocks. Before anything runs, the list
//! is resolved once into a small tree of [`PlanNode`]s. Each resolver takes
//! the index of the step it starts at and returns the node plus the index of
//! the first step after it, so nested blocks consume their own end markers
//! and never leak into the enclosing scan.

use std::fmt::Write as _;

use crate::error::RunError;
use crate::script::{Step, StepType};

/// Resolved block structure, borrowing steps from the script
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode<'a> {
    /// A step dispatched on its own
    Sequential(&'a Step),
    /// `If` ... [`Else` ...] `EndIf`
    Conditional {
        guard: &'a Step,
        then_branch: Vec<PlanNode<'a>>,
        else_branch: Vec<PlanNode<'a>>,
    },
    /// `While` ... `EndWhile`
    Loop {
        guard: &'a Step,
        body: Vec<PlanNode<'a>>,
    },
}

/// Why a block scan stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Marker(StepType),
    EndOfScript,
}

type Resolved<T> = Result<(T, usize), RunError>;

/// Deepest `If` / `While` nesting a script may use
pub const MAX_BLOCK_DEPTH: usize = 64;

/* ===================== Public API ===================== */

/// Resolve a whole step list into plan nodes
///
/// Blocks still open at the end of the list close there. A closing marker
/// with no open block, or a second `Else`, is an [`RunError::UnbalancedBlock`].
/// Blocks nested more than [`MAX_BLOCK_DEPTH`] deep are a
/// [`RunError::BlockTooDeep`].
pub fn build_plan(steps: &[Step]) -> Result<Vec<PlanNode<'_>>, RunError> {
    let (nodes, terminator, index) = resolve_sequence(steps, 0, 0)?;
    match terminator {
        Terminator::EndOfScript => Ok(nodes),
        Terminator::Marker(marker) => Err(RunError::UnbalancedBlock { index, marker }),
    }
}

/// Human readable outline of a plan, one node per line
pub fn outline(nodes: &[PlanNode<'_>]) -> String {
    let mut out = String::new();
    write_outline(&mut out, nodes, 0);
    out
}

/* ===================== Resolvers ===================== */

/// Collect nodes from `start` until a block marker or the end of the list.
///
/// Returns the nodes, what stopped the scan, and the index of the stopping
/// marker (or `steps.len()`). `depth` counts the blocks enclosing `start`.
fn resolve_sequence(
    steps: &[Step],
    start: usize,
    depth: usize,
) -> Result<(Vec<PlanNode<'_>>, Terminator, usize), RunError> {
    let mut nodes = Vec::new();
    let mut index = start;

    while let Some(step) = steps.get(index) {
        let step_type = step.step_type();
        if step_type.is_block_marker() {
            return Ok((nodes, Terminator::Marker(step_type), index));
        }
        let (node, next) = resolve_node(steps, index, depth)?;
        nodes.push(node);
        index = next;
    }

    Ok((nodes, Terminator::EndOfScript, index))
}

fn resolve_node(steps: &[Step], index: usize, depth: usize) -> Resolved<PlanNode<'_>> {
    let step = &steps[index];
    let step_type = step.step_type();
    if matches!(step_type, StepType::If | StepType::While) && depth >= MAX_BLOCK_DEPTH {
        return Err(RunError::BlockTooDeep {
            index,
            limit: MAX_BLOCK_DEPTH,
        });
    }

    match step_type {
        StepType::If => resolve_if(steps, index, depth + 1),
        StepType::While => resolve_while(steps, index, depth + 1),
        _ => Ok((PlanNode::Sequential(step), index + 1)),
    }
}

fn resolve_if(steps: &[Step], index: usize, depth: usize) -> Resolved<PlanNode<'_>> {
    let guard = &steps[index];
    let (then_branch, terminator, at) = resolve_sequence(steps, index + 1, depth)?;

    let (else_branch, next) = match terminator {
        Terminator::EndOfScript => (Vec::new(), at),
        Terminator::Marker(StepType::EndIf) => (Vec::new(), at + 1),
        Terminator::Marker(StepType::Else) => {
            let (else_branch, terminator, at) = resolve_sequence(steps, at + 1, depth)?;
            match terminator {
                Terminator::EndOfScript => (else_branch, at),
                Terminator::Marker(StepType::EndIf) => (else_branch, at + 1),
                Terminator::Marker(marker) => {
                    return Err(RunError::UnbalancedBlock { index: at, marker })
                }
            }
        }
        Terminator::Marker(marker) => return Err(RunError::UnbalancedBlock { index: at, marker }),
    };

    Ok((
        PlanNode::Conditional {
            guard,
            then_branch,
            else_branch,
        },
        next,
    ))
}

fn resolve_while(steps: &[Step], index: usize, depth: usize) -> Resolved<PlanNode<'_>> {
    let guard = &steps[index];
    let (body, terminator, at) = resolve_sequence(steps, index + 1, depth)?;

    let next = match terminator {
        Terminator::EndOfScript => at,
        Terminator::Marker(StepType::EndWhile) => at + 1,
        Terminator::Marker(marker) => return Err(RunError::UnbalancedBlock { index: at, marker }),
    };

    Ok((PlanNode::Loop { guard, body }, next))
}

/* ===================== Outline ===================== */

fn write_outline(out: &mut String, nodes: &[PlanNode<'_>], depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            PlanNode::Sequential(step) => {
                let _ = writeln!(out, "{}{} {}", indent, step.step_type(), step.name);
            }
            PlanNode::Conditional {
                guard,
                then_branch,
                else_branch,
            } => {
                let _ = writeln!(
                    out,
                    "{}If {} [{}]",
                    indent,
                    guard.name,
                    guard.expression().unwrap_or_default()
                );
                write_outline(out, then_branch, depth + 1);
                if !else_branch.is_empty() {
                    let _ = writeln!(out, "{}Else", indent);
                    write_outline(out, else_branch, depth + 1);
                }
                let _ = writeln!(out, "{}EndIf", indent);
            }
            PlanNode::Loop { guard, body } => {
                let _ = writeln!(
                    out,
                    "{}While {} [{}]",
                    indent,
                    guard.name,
                    guard.expression().unwrap_or_default()
                );
                write_outline(out, body, depth + 1);
                let _ = writeln!(out, "{}EndWhile", indent);
            }
        }
    }
}
