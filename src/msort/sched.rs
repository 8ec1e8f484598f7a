//! The recursive split/merge scheduler.
//!
//! Each node splits its slice at a record boundary, resolves both halves
//! (possibly offloading the left one to a forked process or a scoped
//! thread, as the remaining budgets allow), then merges the sorted halves
//! back into its primary buffer. Safety comes from spatial partitioning
//! alone: a node and its offloaded child touch only the disjoint byte
//! ranges carved out by `split_at_mut`, so no locks or atomics appear
//! anywhere in the engine.

use std::thread;

use super::error::SortError;
use super::merge::merge;
use super::split::split_point;
use super::trace::{Phase, Progress, Strategy, child_masks};
use super::worker::ForkWorker;

/// Initial knobs for a sort run.
#[derive(Debug, Clone, Copy)]
pub struct SortOptions {
    /// Record separator byte (`b'\n'` for text lines, `b'\0'` for -z).
    pub separator: u8,
    /// Process-worker spawn budget for the whole run.
    pub jobs: usize,
    /// Thread-worker spawn budget, consumed once `jobs` is spent.
    pub threads: usize,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions {
            separator: b'\n',
            jobs: 1,
            threads: 1,
        }
    }
}

/// One node of the recursion tree. `data` is the slice being sorted in
/// place; `scratch` is an identical-length copy of the same records. The
/// children sort the scratch halves (roles swap at every level) and the
/// node merges them back into `data`.
pub(crate) struct WorkItem<'a> {
    pub data: &'a mut [u8],
    pub scratch: &'a mut [u8],
    pub depth: u16,
    pub mask: u32,
    pub jobs: usize,
    pub threads: usize,
}

impl WorkItem<'_> {
    pub(crate) fn reborrow(&mut self) -> WorkItem<'_> {
        WorkItem {
            data: &mut *self.data,
            scratch: &mut *self.scratch,
            depth: self.depth,
            mask: self.mask,
            jobs: self.jobs,
            threads: self.threads,
        }
    }
}

/// Per-run state shared by every node: the separator byte and the
/// optional progress observer.
pub(crate) struct Ctx<'p> {
    pub sep: u8,
    pub progress: Option<&'p dyn Progress>,
}

impl Ctx<'_> {
    fn trace(&self, depth: u16, mask: u32, phase: Phase) {
        if mask != 0 {
            if let Some(p) = self.progress {
                p.on_phase(depth, mask, phase);
            }
        }
    }
}

/// Divide a budget after consuming one unit for the offloaded child.
/// Deterministic floor/ceil split: the left child gets the floor.
#[inline]
pub(crate) fn divide(budget: usize) -> (usize, usize) {
    let rest = budget - 1;
    (rest / 2, rest - rest / 2)
}

/// Sort `data` in place.
///
/// `data` must be empty or consist of whole records, each terminated by
/// `opts.separator` (including the last). `opts.jobs` and `opts.threads`
/// bound the number of forked and threaded workers the run may create;
/// with both at 1 the sort is fully sequential.
pub fn sort_buffer(
    data: &mut [u8],
    opts: &SortOptions,
    progress: Option<&dyn Progress>,
) -> Result<(), SortError> {
    if data.is_empty() {
        return Ok(());
    }
    debug_assert_eq!(
        data.last(),
        Some(&opts.separator),
        "input buffer must be separator-terminated"
    );

    let mut scratch: Vec<u8> = Vec::new();
    scratch
        .try_reserve_exact(data.len())
        .map_err(|_| SortError::Allocation(data.len()))?;
    scratch.extend_from_slice(data);

    let ctx = Ctx {
        sep: opts.separator,
        progress,
    };
    let item = WorkItem {
        data,
        scratch: &mut scratch,
        depth: 0,
        mask: u32::MAX,
        jobs: opts.jobs,
        threads: opts.threads,
    };
    sort_node(item, &ctx)
}

/// One node of the recursion. Returns with `item.data` sorted.
pub(crate) fn sort_node(mut item: WorkItem<'_>, ctx: &Ctx<'_>) -> Result<(), SortError> {
    let split = split_point(item.data, ctx.sep);
    if split == 0 {
        // Single record, already sorted.
        return Ok(());
    }

    let depth = item.depth + 1;
    let (lmask, rmask) = child_masks(item.mask, depth);

    {
        // Children sort the scratch halves; this node's data halves become
        // their scratch.
        let (ldata, rdata) = item.scratch.split_at_mut(split);
        let (lscratch, rscratch) = item.data.split_at_mut(split);

        if item.jobs > 1 {
            // One job pays for the fork; the children split the rest and
            // inherit the thread budget untouched.
            let (ljobs, rjobs) = divide(item.jobs);
            let mut left = WorkItem {
                data: ldata,
                scratch: lscratch,
                depth,
                mask: lmask,
                jobs: ljobs,
                threads: item.threads,
            };
            let right = WorkItem {
                data: rdata,
                scratch: rscratch,
                depth,
                mask: rmask,
                jobs: rjobs,
                threads: item.threads,
            };

            ctx.trace(item.depth, item.mask, Phase::Sort(Strategy::Fork));
            let worker = ForkWorker::spawn(&mut left, ctx)?;
            let right_res = sort_node(right, ctx);
            let left_res = worker.join(left.data);
            right_res?;
            left_res?;
            ctx.trace(item.depth, item.mask, Phase::Merge(Strategy::Fork));
        } else if item.threads > 1 {
            let (lthreads, rthreads) = divide(item.threads);
            let left = WorkItem {
                data: ldata,
                scratch: lscratch,
                depth,
                mask: lmask,
                jobs: item.jobs,
                threads: lthreads,
            };
            let right = WorkItem {
                data: rdata,
                scratch: rscratch,
                depth,
                mask: rmask,
                jobs: item.jobs,
                threads: rthreads,
            };

            ctx.trace(item.depth, item.mask, Phase::Sort(Strategy::Thread));
            thread::scope(|s| -> Result<(), SortError> {
                let handle = thread::Builder::new()
                    .name("msort-worker".into())
                    .spawn_scoped(s, || sort_node(left, ctx))
                    .map_err(|e| SortError::WorkerLaunch {
                        op: "thread spawn",
                        source: e,
                    })?;
                let right_res = sort_node(right, ctx);
                // A panicked worker counts as a failed exit.
                let left_res = handle
                    .join()
                    .unwrap_or(Err(SortError::WorkerExit { status: 101 }));
                right_res?;
                left_res
            })?;
            ctx.trace(item.depth, item.mask, Phase::Merge(Strategy::Thread));
        } else {
            // Budgets exhausted: both children run here, inheriting the
            // spent budgets unchanged.
            let left = WorkItem {
                data: ldata,
                scratch: lscratch,
                depth,
                mask: lmask,
                jobs: item.jobs,
                threads: item.threads,
            };
            let right = WorkItem {
                data: rdata,
                scratch: rscratch,
                depth,
                mask: rmask,
                jobs: item.jobs,
                threads: item.threads,
            };

            ctx.trace(item.depth, item.mask, Phase::Sort(Strategy::Inline));
            sort_node(left, ctx)?;
            sort_node(right, ctx)?;
            ctx.trace(item.depth, item.mask, Phase::Merge(Strategy::Inline));
        }
    }

    // Both children resolved into the scratch halves; interleave them back
    // into this node's primary buffer.
    let (lrun, rrun) = item.scratch.split_at(split);
    merge(item.data, lrun, rrun, ctx.sep);
    Ok(())
}
