//! Serial pipelines of operations with batch coalescing.
//!
//! A chain is a sequence of steps executed in order; [`exec`] drives any
//! number of chains to completion, round by round. Within a round, steps
//! reporting the same [`BatchHandle`] are delivered to their batch in a
//! single call, which is how an implementation with a batched transport
//! (say, a pipelined network cache) coalesces many concurrent requests.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A link in a chain of operations.
pub enum Step {
    /// Executed on its own.
    Single(Box<dyn SingleStep>),
    /// Coalesced with the other steps of the round reporting the same
    /// [`BatchHandle`] into one batched call.
    Batch(Box<dyn BatchStep>),
}

/// Outcome of one step. An error ends the chain with that error; `Ok(Some)`
/// hands ownership of the next step over to the driver; `Ok(None)`
/// completes the chain.
pub type StepResult = Result<Option<Step>, anyhow::Error>;

/// A step executed by itself.
pub trait SingleStep {
    fn exec(self: Box<Self>) -> StepResult;
}

/// A step executed together with the other steps of its batch.
pub trait BatchStep {
    /// The batch this step belongs to.
    fn batch(&self) -> BatchHandle;

    /// Recovers the concrete step for its batch implementation.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Executes all the steps of one round of a batch in a single call.
pub trait Batch {
    /// One result per step, in input order. Returning fewer results ends
    /// the unanswered chains; extra results are ignored.
    fn exec(&self, steps: Vec<Box<dyn BatchStep>>) -> Vec<StepResult>;
}

/// Identity of a [`Batch`]: two handles group steps together exactly when
/// they wrap the same allocation.
#[derive(Clone)]
pub struct BatchHandle(Arc<dyn Batch>);

impl BatchHandle {
    pub fn new(batch: Arc<dyn Batch>) -> BatchHandle {
        BatchHandle(batch)
    }
}

impl PartialEq for BatchHandle {
    fn eq(&self, other: &BatchHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for BatchHandle {}

impl fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BatchHandle({:p})", Arc::as_ptr(&self.0))
    }
}

/// Drives every chain to completion. The result has one slot per initial
/// step, holding the error that ended the chain, if any; a chain keeps its
/// slot through every round.
pub fn exec(steps: Vec<Step>) -> Vec<Option<anyhow::Error>> {
    let mut errs: Vec<Option<anyhow::Error>> = Vec::new();
    errs.resize_with(steps.len(), || None);
    let mut round: Vec<(usize, Step)> = steps.into_iter().enumerate().collect();
    while !round.is_empty() {
        let mut next_round: Vec<(usize, Step)> = Vec::new();
        // Batches keyed by handle in first-seen order, members in input
        // order.
        let mut batches: Vec<(BatchHandle, Vec<usize>, Vec<Box<dyn BatchStep>>)> = Vec::new();
        for (chain, step) in round {
            match step {
                Step::Single(step) => settle(chain, step.exec(), &mut errs, &mut next_round),
                Step::Batch(step) => {
                    let handle = step.batch();
                    match batches.iter_mut().find(|(h, ..)| *h == handle) {
                        Some((_, chains, members)) => {
                            chains.push(chain);
                            members.push(step);
                        }
                        None => batches.push((handle, vec![chain], vec![step])),
                    }
                }
            }
        }
        for (handle, chains, members) in batches {
            let results = handle.0.exec(members);
            for (chain, result) in chains.into_iter().zip(results) {
                settle(chain, result, &mut errs, &mut next_round);
            }
        }
        round = next_round;
    }
    errs
}

fn settle(
    chain: usize,
    result: StepResult,
    errs: &mut [Option<anyhow::Error>],
    next_round: &mut Vec<(usize, Step)>,
) {
    match result {
        Err(err) => errs[chain] = Some(err),
        Ok(Some(next)) => next_round.push((chain, next)),
        Ok(None) => {}
    }
}
