//! Memory Serialization Unit Tests.
//!
//! Verifies the third-source dependency chains added while a serialization
//! budget is armed, at each level:
//! - Level 0: every memory op after the previous one
//! - Level 1: loads after stores, stores after any memory op
//! - Level 2: memory ops sharing a base register window

use crate::common::builder::instruction::{InstBuilder, alu, load, store};
use crate::common::harness::{TestContext, small_config};
use o3sim_core::config::CoreConfig;
use o3sim_core::core::pipeline::dinst::{InstId, InstState, Opcode};
use pretty_assertions::assert_eq;

fn serializing(level: u8, budget: u32) -> TestContext {
    let config = CoreConfig {
        serialize_level: level,
        ..small_config()
    };
    let mut ctx = TestContext::new(config);
    ctx.core.set_serialize_for(budget);
    ctx
}

// ══════════════════════════════════════════════════════════
// 1. Level 2: Register Windows
// ══════════════════════════════════════════════════════════

#[test]
fn loads_sharing_a_base_form_a_chain() {
    let mut ctx = serializing(2, 3);
    let h = ctx.dispatch_all([load(1, 1, 5), load(2, 2, 5), load(3, 3, 5)]);

    assert_eq!(ctx.core.inst(h[0]).map(|d| d.deps[2]), Some(None));
    assert_eq!(ctx.core.inst(h[1]).map(|d| d.deps[2]), Some(Some(h[0])));
    assert_eq!(ctx.core.inst(h[2]).map(|d| d.deps[2]), Some(Some(h[1])));
    assert_eq!(ctx.core.serialize_for(), 0);
    assert_eq!(ctx.core.inst(h[2]).map(|d| d.serialize_entry), Some(Some(5)));
}

#[test]
fn different_bases_do_not_chain() {
    let mut ctx = serializing(2, 4);
    let h = ctx.dispatch_all([load(1, 1, 5), store(2, 6, 1), load(3, 3, 7)]);
    for handle in h {
        assert_eq!(ctx.core.inst(handle).map(|d| d.deps[2]), Some(None));
    }
}

#[test]
fn overwriting_the_base_closes_the_window() {
    let mut ctx = serializing(2, 4);
    let _ = ctx.dispatch(load(1, 1, 5));
    let _ = ctx.dispatch(alu(2, 5, 5, 3));
    let h = ctx.dispatch(load(3, 2, 5));
    assert_eq!(ctx.core.inst(h).map(|d| d.deps[2]), Some(None));
}

#[test]
fn committed_op_leaves_the_window() {
    let mut ctx = serializing(2, 4);
    let first = ctx.dispatch(load(1, 1, 5));
    ctx.execute(first);
    let _ = ctx.drain(10);

    let h = ctx.dispatch(load(2, 2, 5));
    assert_eq!(ctx.core.inst(h).map(|d| d.deps[2]), Some(None));
}

#[test]
fn budget_consumed_by_every_admission() {
    let mut ctx = serializing(2, 2);
    let _ = ctx.dispatch_all([alu(1, 1, 2, 3), alu(2, 4, 2, 3)]);
    assert_eq!(ctx.core.serialize_for(), 0);

    let h = ctx.dispatch_all([load(3, 1, 5), load(4, 2, 5)]);
    assert_eq!(ctx.core.inst(h[1]).map(|d| d.deps[2]), Some(None));
}

#[test]
fn idle_budget_adds_no_dependencies() {
    let mut ctx = serializing(0, 0);
    let h = ctx.dispatch_all([store(1, 5, 1), load(2, 2, 5)]);
    assert_eq!(ctx.core.inst(h[1]).map(|d| d.deps[2]), Some(None));
}

// ══════════════════════════════════════════════════════════
// 2. Levels 0 and 1
// ══════════════════════════════════════════════════════════

#[test]
fn level_zero_chains_all_memory_ops() {
    let mut ctx = serializing(0, 4);
    let h = ctx.dispatch_all([store(1, 5, 1), load(2, 2, 6), alu(3, 3, 2, 2), load(4, 4, 7)]);

    assert_eq!(ctx.core.inst(h[1]).map(|d| d.deps[2]), Some(Some(h[0])));
    assert_eq!(ctx.core.inst(h[2]).map(|d| d.deps[2]), Some(None));
    assert_eq!(ctx.core.inst(h[3]).map(|d| d.deps[2]), Some(Some(h[1])));
}

#[test]
fn issued_predecessor_is_not_chained() {
    let mut ctx = serializing(0, 2);
    let first = ctx.dispatch(store(1, 5, 1));
    ctx.core.issued(first);
    assert_eq!(ctx.core.inst(first).map(|d| d.state), Some(InstState::Issued));
    let h = ctx.dispatch(load(2, 2, 6));
    assert_eq!(ctx.core.inst(h).map(|d| d.deps[2]), Some(None));
}

#[test]
fn level_one_skips_issued_store() {
    let mut ctx = serializing(1, 3);
    let first = ctx.dispatch(store(1, 5, 1));
    ctx.core.issued(first);
    let h = ctx.dispatch_all([load(2, 2, 6), store(3, 8, 1)]);
    assert_eq!(ctx.core.inst(h[0]).map(|d| d.deps[2]), Some(None));
    assert_eq!(ctx.core.inst(h[1]).map(|d| d.deps[2]), Some(None));
}

#[test]
fn executing_predecessor_is_not_chained() {
    let mut ctx = serializing(0, 2);
    let first = ctx.dispatch(store(1, 5, 1));
    ctx.core.executing(first);
    let h = ctx.dispatch(load(2, 2, 6));
    assert_eq!(ctx.core.inst(h).map(|d| d.deps[2]), Some(None));
}

#[test]
fn level_one_orders_memory_ops_after_stores() {
    let mut ctx = serializing(1, 4);
    let h = ctx.dispatch_all([store(1, 5, 1), load(2, 2, 6), load(3, 3, 7), store(4, 8, 1)]);

    assert_eq!(ctx.core.inst(h[0]).map(|d| d.deps[2]), Some(None));
    assert_eq!(ctx.core.inst(h[1]).map(|d| d.deps[2]), Some(Some(h[0])));
    assert_eq!(ctx.core.inst(h[2]).map(|d| d.deps[2]), Some(Some(h[0])));
    assert_eq!(ctx.core.inst(h[3]).map(|d| d.deps[2]), Some(Some(h[0])));
}

#[test]
fn level_one_store_skips_intervening_load() {
    let mut ctx = serializing(1, 8);
    let h = ctx.dispatch_all([store(1, 5, 1), load(2, 2, 6), store(3, 8, 1)]);
    assert_eq!(ctx.core.inst(h[2]).map(|d| d.deps[2]), Some(Some(h[0])));
    let chained = ctx.core.inst(h[2]).and_then(|d| d.deps[2]);
    assert_eq!(chained.and_then(|p| ctx.core.inst(p)).map(|p| p.id), Some(InstId(1)));
}

#[test]
fn level_one_ignores_non_memory_ops() {
    let mut ctx = serializing(1, 3);
    let h = ctx.dispatch_all([
        store(1, 5, 1),
        InstBuilder::new(2, Opcode::Branch).src1(5).build(),
        load(3, 2, 5),
    ]);
    assert_eq!(ctx.core.inst(h[1]).map(|d| d.deps[2]), Some(None));
    assert_eq!(ctx.core.inst(h[2]).map(|d| d.deps[2]), Some(Some(h[0])));
}

// ══════════════════════════════════════════════════════════
// 3. Recovery
// ══════════════════════════════════════════════════════════

#[test]
fn suspended_while_recovering() {
    let mut ctx = serializing(0, 0);
    let _ = ctx.dispatch(store(1, 5, 1));
    let younger = ctx.dispatch(load(5, 2, 5));
    ctx.core.replay(younger);
    ctx.core.set_serialize_for(3);

    let h = ctx.dispatch(load(3, 3, 5));
    assert_eq!(ctx.core.inst(h).map(|d| d.deps[2]), Some(None));
    assert_eq!(ctx.core.serialize_for(), 3);
}
