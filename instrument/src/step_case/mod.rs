mod impls;

use crate::KindConfig;

/// Step case of k-induction: starts each loop from an arbitrary state, assumes
/// its assertions for `k` iterations and checks them on the next one.
pub struct InductiveStep {
	pub config: KindConfig,
}
