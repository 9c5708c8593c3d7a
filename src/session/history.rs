//! The recorded run and its breakpoint and block indices.

use super::state::{BreakpointPayload, Step};

const BLOCK_STATEMENT: &str = "BlockStatement";

/// Whether moving from an entry at `previous` to one at `node` enters a block.
pub fn enters_block(previous: &str, node: &str) -> bool {
    node == BLOCK_STATEMENT && previous != BLOCK_STATEMENT
}

#[derive(Debug, Clone, Default)]
pub struct History {
    steps: Vec<Step>,
    breakpoint_points: Vec<usize>,
    block_points: Vec<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
        self.breakpoint_points.clear();
        self.block_points.clear();
    }

    pub fn push(&mut self, step: Step) {
        if step.breakpoint.is_some() {
            self.mark_breakpoint(step.index);
        }
        self.steps.push(step);
    }

    /// Attaches a payload to the last entry. Used when the run ends while a
    /// breakpoint call is still on the stack.
    pub fn attach_to_last(&mut self, payload: BreakpointPayload) {
        if let Some(last) = self.steps.last_mut() {
            let index = last.index;
            last.breakpoint = Some(payload);
            self.mark_breakpoint(index);
        }
    }

    fn mark_breakpoint(&mut self, index: usize) {
        if self.breakpoint_points.last().map_or(true, |&last| last < index) {
            self.breakpoint_points.push(index);
        }
    }

    /// Recomputes the block points: entries whose innermost node is a block
    /// while that of the entry before is not.
    pub fn compute_block_points(&mut self) {
        self.block_points = self
            .steps
            .windows(2)
            .filter(|pair| enters_block(&pair[0].node_type, &pair[1].node_type))
            .map(|pair| pair[1].index)
            .collect();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn breakpoint_points(&self) -> &[usize] {
        &self.breakpoint_points
    }

    pub fn block_points(&self) -> &[usize] {
        &self.block_points
    }

    pub fn is_breakpoint_point(&self, index: usize) -> bool {
        self.breakpoint_points.binary_search(&index).is_ok()
    }

    pub fn is_block_point(&self, index: usize) -> bool {
        self.block_points.binary_search(&index).is_ok()
    }

    pub fn next_breakpoint(&self, after: usize) -> Option<usize> {
        next_in(&self.breakpoint_points, after)
    }

    pub fn prev_breakpoint(&self, before: usize) -> Option<usize> {
        prev_in(&self.breakpoint_points, before)
    }

    pub fn next_block(&self, after: usize) -> Option<usize> {
        next_in(&self.block_points, after)
    }

    pub fn prev_block(&self, before: usize) -> Option<usize> {
        prev_in(&self.block_points, before)
    }
}

/// Smallest element strictly greater than `after`.
fn next_in(points: &[usize], after: usize) -> Option<usize> {
    let i = points.partition_point(|&p| p <= after);
    points.get(i).copied()
}

/// Largest element strictly less than `before`.
fn prev_in(points: &[usize], before: usize) -> Option<usize> {
    let i = points.partition_point(|&p| p < before);
    i.checked_sub(1).map(|i| points[i])
}
