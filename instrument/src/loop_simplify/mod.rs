mod impls;

/// Gives every reachable loop a preheader and a single latch.
#[derive(Default)]
pub struct LoopSimplify {}
