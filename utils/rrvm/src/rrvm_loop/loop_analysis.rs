use std::collections::HashMap;

use log::trace;

use crate::{basicblock::Node, cfg::CFG, dominator::DomTree};

use super::{Loop, LoopForest, LoopPtr};

impl LoopForest {
	pub fn new(cfg: &CFG, dom_tree: &DomTree) -> Self {
		let mut loop_map: HashMap<i32, LoopPtr> = HashMap::new();
		let mut loops = Vec::new();
		loop_dfs(cfg.get_entry(), cfg, dom_tree, &mut loop_map, &mut loops);

		let root = Loop::new_ptr(0, cfg.get_entry());
		for bb in cfg.blocks.iter() {
			let id = bb.borrow().id;
			if dom_tree.is_reachable(id) && !loop_map.contains_key(&id) {
				loop_map.insert(id, root.clone());
			}
		}
		// 按 header 的布局顺序编号并挂到父循环下
		let position = |l: &LoopPtr| cfg.position(&l.borrow().header);
		loops.sort_by_key(position);
		for (i, l) in loops.iter().enumerate() {
			l.borrow_mut().id = i as u32 + 1;
		}
		for l in loops.iter() {
			let outer = l.borrow().get_outer().unwrap_or_else(|| root.clone());
			l.borrow_mut().outer = Some(std::rc::Rc::downgrade(&outer));
			outer.borrow_mut().subloops.push(l.clone());
		}
		calc_loop_level(&root, 0);
		for l in loops.iter() {
			trace!("{}", l.borrow());
		}
		Self { root, loop_map }
	}
}

fn calc_loop_level(loop_: &LoopPtr, level: u32) {
	loop_.borrow_mut().level = level;
	let subloops = loop_.borrow().subloops.clone();
	for sub in subloops.iter() {
		calc_loop_level(sub, level + 1);
	}
}

fn outermost(loop_: &LoopPtr) -> LoopPtr {
	let mut cur = loop_.clone();
	loop {
		let outer = cur.borrow().get_outer();
		match outer {
			Some(outer) => cur = outer,
			None => return cur,
		}
	}
}

// 在支配树上后序遍历，内层循环的 header 先被处理
fn loop_dfs(
	cur_bb: Node,
	cfg: &CFG,
	dom_tree: &DomTree,
	loop_map: &mut HashMap<i32, LoopPtr>,
	loops: &mut Vec<LoopPtr>,
) {
	let cur_id = cur_bb.borrow().id;
	for child in dom_tree.get_children(cur_id).iter() {
		if let Some(next) = cfg.blocks.iter().find(|v| v.borrow().id == *child) {
			loop_dfs(next.clone(), cfg, dom_tree, loop_map, loops);
		}
	}
	// 看看自己的前驱有没有被自己支配的，有的话就有循环存在，与自己前驱之间的边就是 backedge
	let mut bbs: Vec<Node> = cur_bb
		.borrow()
		.prev
		.iter()
		.filter(|v| dom_tree.dominates(cur_id, v.borrow().id))
		.cloned()
		.collect();
	if bbs.is_empty() {
		return;
	}
	let new_loop = Loop::new_ptr(0, cur_bb.clone());
	loops.push(new_loop.clone());
	while let Some(bb) = bbs.pop() {
		let bb_id = bb.borrow().id;
		if !dom_tree.is_reachable(bb_id) {
			continue;
		}
		match loop_map.get(&bb_id).cloned() {
			None => {
				loop_map.insert(bb_id, new_loop.clone());
				if bb_id != cur_id {
					bbs.extend(bb.borrow().prev.iter().cloned());
				}
			}
			Some(inner_loop) => {
				let inner_loop = outermost(&inner_loop);
				if std::rc::Rc::ptr_eq(&inner_loop, &new_loop) {
					continue;
				}
				inner_loop.borrow_mut().outer = Some(std::rc::Rc::downgrade(&new_loop));
				let header = inner_loop.borrow().header.clone();
				bbs.extend(header.borrow().prev.iter().cloned());
			}
		}
	}
}
