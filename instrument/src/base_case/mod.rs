mod impls;

use crate::KindConfig;

/// Base case of k-induction: cuts every path through a loop after a fixed
/// number of backedge traversals.
pub struct InductiveBase {
	pub config: KindConfig,
}
