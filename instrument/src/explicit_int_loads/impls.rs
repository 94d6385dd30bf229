use std::collections::HashMap;

use llvm::{LlvmInstrVariant, LlvmTemp, LoadInstr, Value, VarType};
use log::debug;
use rrvm::{program::LlvmProgram, LlvmNode};
use utils::errors::Result;

use super::ExplicitIntLoads;
use crate::{editor::LoopEditor, RrvmPass};

impl ExplicitIntLoads {
	pub fn new() -> Self {
		Self::default()
	}
}

/// Every `alloca` of the function: slot -> (block, element type).
fn alloca_map(editor: &LoopEditor) -> HashMap<LlvmTemp, (LlvmNode, VarType)> {
	let mut map = HashMap::new();
	for bb in editor.func.cfg.blocks.iter() {
		for instr in bb.borrow().instrs.iter() {
			if let LlvmInstrVariant::AllocInstr(alloc) = instr.get_variant() {
				map.insert(alloc.target.clone(), (bb.clone(), alloc.var_type));
			}
		}
	}
	map
}

impl RrvmPass for ExplicitIntLoads {
	fn apply(self, program: &mut LlvmProgram) -> Result<bool> {
		let mut flag = false;
		for func in program.funcs.iter_mut() {
			let mut editor =
				LoopEditor::new(func, &mut program.temp_mgr, &mut program.externals);
			let allocas = alloca_map(&editor);
			for loop_ in editor.loops() {
				let header = loop_.borrow().header.clone();
				let mut slots: Vec<(LlvmTemp, VarType)> = Vec::new();
				for bb in editor.forest.blocks(&loop_, &editor.func.cfg) {
					for instr in bb.borrow().instrs.iter() {
						let LlvmInstrVariant::StoreInstr(store) = instr.get_variant() else {
							continue;
						};
						let Value::Temp(addr) = &store.addr else {
							continue;
						};
						let Some((def_bb, var_type)) = allocas.get(addr) else {
							continue;
						};
						if var_type.is_int()
							&& editor.dom_tree.dominates_node(def_bb, &header)
							&& !slots.iter().any(|(v, _)| v == addr)
						{
							slots.push((addr.clone(), *var_type));
						}
					}
				}
				for (addr, var_type) in slots {
					let target =
						editor.temp_mgr.new_named_temp(format!("{}.ex", addr.name), var_type);
					debug!(
						"{}: explicit load {} in {}",
						editor.func.name,
						target,
						header.borrow().name
					);
					header.borrow_mut().push(Box::new(LoadInstr {
						target,
						var_type,
						addr: Value::Temp(addr),
					}));
					flag = true;
				}
			}
		}
		Ok(flag)
	}
}

#[cfg(test)]
mod tests {
	use crate::{test_utils::parse_ok, ExplicitIntLoads, RrvmPass};

	#[test]
	fn stored_slots_are_loaded_in_header() {
		let src = r#"
define void @main() {
entry:
  %x = alloca i32
  %f = alloca float
  br label %loop
loop:
  %v = load i32, ptr %x
  %v.next = add i32 %v, 1
  store i32 %v.next, ptr %x
  store float 1.0, ptr %f
  %c = icmp slt i32 %v.next, 10
  br i1 %c, label %loop, label %exit
exit:
  ret void
}
"#;
		let mut program = parse_ok(src);
		assert!(ExplicitIntLoads::new().apply(&mut program).unwrap());
		let text = program.to_string();
		assert!(text.contains("  %x.ex = load i32, ptr %x\n  br i1 %c, label %loop, label %exit"));
		assert!(!text.contains("%f.ex"));
	}

	#[test]
	fn nothing_to_load_without_loops() {
		let src = "define void @main() {\nentry:\n  %x = alloca i32\n  store i32 1, ptr %x\n  ret void\n}\n";
		let mut program = parse_ok(src);
		assert!(!ExplicitIntLoads::new().apply(&mut program).unwrap());
	}
}
