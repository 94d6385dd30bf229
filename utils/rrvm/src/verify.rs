//! Structural checks on a function's blocks: edges mirror terminators, and
//! every phi has exactly one incoming entry per predecessor edge.

use std::collections::HashMap;

use utils::{KindError, Result};

use crate::func::LlvmFunc;

fn count_labels<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
	let mut map = HashMap::new();
	for name in names {
		*map.entry(name).or_insert(0) += 1;
	}
	map
}

pub fn check_edges(func: &LlvmFunc) -> Result<()> {
	for bb in func.cfg.blocks.iter() {
		let bb_ = bb.borrow();
		let labels: Vec<String> =
			bb_.succ_labels().into_iter().map(|v| v.name).collect();
		let succ: Vec<String> =
			bb_.succ.iter().map(|v| v.borrow().name.clone()).collect();
		if labels != succ {
			return Err(KindError::InvalidIr(format!(
				"{}: block {} branches to [{}] but records successors [{}]",
				func.name,
				bb_.name,
				labels.join(", "),
				succ.join(", ")
			)));
		}
		for s in bb_.succ.iter() {
			let in_prev =
				s.borrow().prev.iter().filter(|v| std::rc::Rc::ptr_eq(v, bb)).count();
			let in_succ =
				bb_.succ.iter().filter(|v| std::rc::Rc::ptr_eq(v, s)).count();
			if in_prev != in_succ {
				return Err(KindError::InvalidIr(format!(
					"{}: edge {} -> {} is not mirrored in the predecessor list",
					func.name,
					bb_.name,
					s.borrow().name
				)));
			}
		}
		if bb_.jump_instr.as_ref().map_or(true, |v| !v.is_terminator()) {
			return Err(KindError::InvalidIr(format!(
				"{}: block {} has no terminator",
				func.name, bb_.name
			)));
		}
	}
	Ok(())
}

/// The multiset of incoming labels of every phi equals the multiset of the
/// block's predecessor labels.
pub fn check_phi_nodes(func: &LlvmFunc) -> Result<()> {
	for bb in func.cfg.blocks.iter() {
		let bb_ = bb.borrow();
		let prev_names: Vec<String> =
			bb_.prev.iter().map(|v| v.borrow().name.clone()).collect();
		let expected = count_labels(prev_names.iter().map(|v| v.as_str()));
		for phi in bb_.phi_instrs.iter() {
			let found =
				count_labels(phi.source.iter().map(|(_, l)| l.name.as_str()));
			if found != expected {
				let mut incoming: Vec<_> =
					phi.source.iter().map(|(_, l)| l.name.clone()).collect();
				incoming.sort();
				let mut preds = prev_names.clone();
				preds.sort();
				return Err(KindError::MalformedPhi {
					func: func.name.clone(),
					block: bb_.name.clone(),
					phi: phi.target.to_string(),
					detail: format!(
						"incoming [{}], predecessors [{}]",
						incoming.join(", "),
						preds.join(", ")
					),
				});
			}
			if let Some((v, l)) =
				phi.source.iter().find(|(v, _)| v.get_type() != phi.var_type)
			{
				return Err(KindError::MalformedPhi {
					func: func.name.clone(),
					block: bb_.name.clone(),
					phi: phi.target.to_string(),
					detail: format!("value {} from {} is not {}", v, l, phi.var_type),
				});
			}
		}
	}
	Ok(())
}

pub fn verify_func(func: &LlvmFunc) -> Result<()> {
	check_edges(func)?;
	check_phi_nodes(func)
}

/// Instrumentation runs this after every edit; a failure is a bug in the
/// editing code, not in the input.
pub fn assert_phi_nodes(func: &LlvmFunc) {
	if let Err(err) = verify_func(func) {
		panic!("internal error after editing {}: {}", func.name, err);
	}
}
