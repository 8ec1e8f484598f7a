//! Progress tracing for the recursion tree.
//!
//! Each node carries a 32-bit mask roughly picturing its slice of the
//! root buffer (e.g. `####............` for the first quarter). The mask
//! is pure instrumentation — it never influences scheduling — and
//! collapses to 0 past depth 5, at which point tracing is skipped.

/// How a node ran its offloaded left child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Fork,
    Thread,
    Inline,
}

/// What a node is about to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sort(Strategy),
    Merge(Strategy),
}

/// Observer for sort/merge progress. Implementations must be `Sync`:
/// thread workers report through the same observer as their parent.
pub trait Progress: Sync {
    fn on_phase(&self, depth: u16, mask: u32, phase: Phase);
}

/// Derive the (left, right) child masks from a parent mask. `child_depth`
/// is the children's depth (parent depth + 1).
pub fn child_masks(mask: u32, child_depth: u16) -> (u32, u32) {
    match child_depth {
        1 => (mask & 0xFFFF_0000, mask & 0x0000_FFFF),
        2 => (mask & 0xFF00_FF00, mask & 0x00FF_00FF),
        3 => (mask & 0xF0F0_F0F0, mask & 0x0F0F_0F0F),
        4 => (mask & 0xCCCC_CCCC, mask & 0x3333_3333),
        5 => (mask & 0xAAAA_AAAA, mask & 0x5555_5555),
        _ => (0, 0),
    }
}

/// Render a mask as 32 `#`/`.` characters, most significant bit first.
pub fn mask_string(mask: u32) -> String {
    (0..32)
        .map(|i| if (mask >> (31 - i)) & 1 == 1 { '#' } else { '.' })
        .collect()
}

/// Prints `[  pid] sort  ####....  [fork]` style lines to stderr.
pub struct StderrTrace;

impl Progress for StderrTrace {
    fn on_phase(&self, _depth: u16, mask: u32, phase: Phase) {
        let (verb, tag) = match phase {
            Phase::Sort(s) => ("sort ", sort_tag(s)),
            Phase::Merge(s) => ("merge", merge_tag(s)),
        };
        eprintln!(
            "[{:6}] {} {}{}",
            std::process::id(),
            verb,
            mask_string(mask),
            tag
        );
    }
}

fn sort_tag(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Fork => " [fork]",
        Strategy::Thread => " [thread]",
        Strategy::Inline => "",
    }
}

fn merge_tag(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Fork => " [from fork]",
        Strategy::Thread => " [from thread]",
        Strategy::Inline => "",
    }
}
