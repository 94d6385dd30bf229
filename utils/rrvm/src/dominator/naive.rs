// naive algorithm computing dominator tree with complexity O(n*m)
// Ref: https://blog.csdn.net/Dong_HFUT/article/details/121375025?spm=1001.2014.3001.5501

use std::collections::{HashMap, HashSet, VecDeque};

use crate::cfg::CFG;

/// For every block reachable from the entry, the ids of the blocks it
/// dominates (itself included).
pub fn compute_dominates(cfg: &CFG) -> HashMap<i32, HashSet<i32>> {
	let entry = cfg.get_entry();
	let reachable_from_entry = reachable(cfg, None);
	let mut dominates = HashMap::new();
	for bb in cfg.blocks.iter() {
		let to_be_removed = bb.borrow().id;
		if !reachable_from_entry.contains(&to_be_removed) {
			continue;
		}
		// 尝试将这个 bb 从图中移除，移除后无法访问的节点是被它支配的节点
		let reachable = if to_be_removed == entry.borrow().id {
			HashSet::new()
		} else {
			reachable(cfg, Some(to_be_removed))
		};
		let set: HashSet<i32> = reachable_from_entry
			.iter()
			.filter(|v| !reachable.contains(v))
			.copied()
			.collect();
		dominates.insert(to_be_removed, set);
	}
	dominates
}

fn reachable(cfg: &CFG, removed: Option<i32>) -> HashSet<i32> {
	let mut visited = HashSet::new();
	let mut worklist = VecDeque::new();
	worklist.push_back(cfg.get_entry());
	while let Some(bb) = worklist.pop_front() {
		let id = bb.borrow().id;
		if Some(id) == removed || !visited.insert(id) {
			continue;
		}
		for succ in bb.borrow().succ.iter() {
			worklist.push_back(succ.clone());
		}
	}
	visited
}

/// The idom of `b` is the strict dominator of `b` that all other strict
/// dominators of `b` dominate.
pub fn compute_idom(dominates: &HashMap<i32, HashSet<i32>>) -> HashMap<i32, i32> {
	let mut idom = HashMap::new();
	for (&a, set) in dominates.iter() {
		for &b in set.iter() {
			if a == b {
				continue;
			}
			// 如果 b 还没有支配者，或者 b 原来的支配者支配了 a，则 a 离 b 更近
			match idom.get(&b) {
				None => {
					idom.insert(b, a);
				}
				Some(old) if dominates[old].contains(&a) => {
					idom.insert(b, a);
				}
				_ => {}
			}
		}
	}
	idom
}
