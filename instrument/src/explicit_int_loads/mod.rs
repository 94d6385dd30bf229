mod impls;

/// Loads, at the end of every loop header, the integer stack slots that the
/// loop stores to, so their values become visible as SSA temps at the header.
#[derive(Default)]
pub struct ExplicitIntLoads {}
