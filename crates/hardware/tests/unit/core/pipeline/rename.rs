//! Rename and Dispatch Unit Tests.
//!
//! Verifies `OooCore::add_inst`:
//! - Admission checks and their precedence
//! - Refusals leave the core untouched and hand the op back
//! - Dependency edges from the register alias table
//! - Speculative/safe classification of loads
//! - Early and late register allocation

use crate::common::builder::instruction::{InstBuilder, alu, branch, load, nop, store};
use crate::common::harness::{
    RecordingEmulator, ScriptedFrontEnd, TestContext, init_tracing, small_config,
};
use crate::common::mocks::cluster::MockExecCluster;
use o3sim_core::OooCore;
use o3sim_core::common::error::StallCause;
use o3sim_core::config::CoreConfig;
use o3sim_core::core::pipeline::dinst::{HartId, InstId, InstState, Opcode};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn config_with(max_rob_size: usize, total_regs: i64) -> CoreConfig {
    CoreConfig {
        max_rob_size,
        total_regs,
        ..small_config()
    }
}

fn mocked_core(
    cluster: MockExecCluster,
) -> OooCore<ScriptedFrontEnd, MockExecCluster, RecordingEmulator> {
    init_tracing();
    let front_end = ScriptedFrontEnd {
        blocked: true,
        ..ScriptedFrontEnd::default()
    };
    match OooCore::new(
        small_config(),
        HartId(0),
        front_end,
        cluster,
        RecordingEmulator::default(),
    ) {
        Ok(core) => core,
        Err(e) => panic!("{e}"),
    }
}

// ══════════════════════════════════════════════════════════
// 1. Admission
// ══════════════════════════════════════════════════════════

#[test]
fn admitted_op_enters_rob_renamed() {
    let mut ctx = TestContext::default();
    let h = ctx.dispatch(alu(1, 1, 2, 3));

    assert_eq!(ctx.core.rob_size(), 1);
    assert_eq!(ctx.core.rob_handles(), vec![h]);
    assert_eq!(ctx.core.inst(h).map(|d| d.state), Some(InstState::Renamed));
    assert_eq!(ctx.core.cluster().added, vec![InstId(1)]);
}

#[test]
fn renamed_time_is_current_cycle() {
    let mut ctx = TestContext::default();
    ctx.run(2);
    let h = ctx.dispatch(nop(1));
    assert_eq!(ctx.core.inst(h).map(|d| d.renamed_time), Some(2));
}

#[test]
fn rob_capacity_leaves_one_entry_margin() {
    let mut ctx = TestContext::new(config_with(4, 0));
    let handles = ctx.dispatch_all((1..=3).map(|id| alu(id, 1, 2, 3)));

    let stall = match ctx.core.add_inst(alu(4, 1, 2, 3)) {
        Err(stall) => stall,
        Ok(_) => panic!("fourth op admitted into a 4-entry ROB"),
    };
    assert_eq!(stall.cause, StallCause::SmallRob);
    assert_eq!(stall.inst.id, InstId(4));

    // Retire the oldest op, then retry with the returned op.
    ctx.execute(handles[0]);
    ctx.run(3);
    assert_eq!(ctx.destroyed(), &[1]);

    let retried = ctx.core.add_inst(stall.inst);
    assert!(retried.is_ok());
    assert_eq!(
        ctx.core.add_inst(alu(5, 1, 2, 3)).err().map(|s| s.cause),
        Some(StallCause::SmallRob)
    );
}

#[test]
fn register_budget_exhaustion_stalls() {
    let mut ctx = TestContext::new(config_with(16, 2));
    let _ = ctx.dispatch(alu(1, 1, 2, 3));
    let _ = ctx.dispatch(alu(2, 4, 2, 3));
    assert_eq!(ctx.core.free_regs(), 0);

    let stall = ctx.core.add_inst(alu(3, 5, 2, 3)).err();
    assert_eq!(stall.map(|s| s.cause), Some(StallCause::SmallReg));
}

#[test]
fn ops_without_destination_take_no_register() {
    let mut ctx = TestContext::new(config_with(16, 1));
    let _ = ctx.dispatch(store(1, 2, 3));
    let _ = ctx.dispatch(branch(2, 2, 3));
    assert_eq!(ctx.core.free_regs(), 1);
}

#[rstest]
#[case::window(StallCause::SmallWindow)]
#[case::loads(StallCause::OutstandingLoads)]
#[case::stores(StallCause::OutstandingStores)]
#[case::branches(StallCause::OutstandingBranches)]
#[case::syscall(StallCause::Syscall)]
fn cluster_refusal_is_reported(#[case] cause: StallCause) {
    let mut ctx = TestContext::default();
    ctx.core.cluster_mut().stall = Some(cause);
    let stall = ctx.core.add_inst(load(1, 1, 2)).err();
    assert_eq!(stall.map(|s| s.cause), Some(cause));
}

// ══════════════════════════════════════════════════════════
// 2. Check Precedence
// ══════════════════════════════════════════════════════════

#[test]
fn replay_checked_before_rob_occupancy() {
    let mut ctx = TestContext::new(config_with(4, 0));
    let h = ctx.dispatch_all([load(1, 1, 2), load(2, 3, 2), load(3, 4, 2)]);
    ctx.core.replay(h[1]);

    let stall = ctx.core.add_inst(load(4, 5, 2)).err();
    assert_eq!(stall.map(|s| s.cause), Some(StallCause::Replays));
}

#[test]
fn rob_occupancy_checked_before_registers() {
    let mut ctx = TestContext::new(config_with(4, 3));
    let _ = ctx.dispatch_all((1..=3).map(|id| alu(id, 1, 2, 3)));
    assert_eq!(ctx.core.free_regs(), 0);

    let stall = ctx.core.add_inst(alu(4, 1, 2, 3)).err();
    assert_eq!(stall.map(|s| s.cause), Some(StallCause::SmallRob));
}

#[test]
fn registers_checked_before_cluster() {
    let mut ctx = TestContext::new(config_with(16, 1));
    ctx.core.cluster_mut().stall = Some(StallCause::SmallWindow);
    ctx.core.cluster_mut().stall_after = Some(1);
    let _ = ctx.dispatch(alu(1, 1, 2, 3));

    let stall = ctx.core.add_inst(alu(2, 4, 2, 3)).err();
    assert_eq!(stall.map(|s| s.cause), Some(StallCause::SmallReg));
}

#[test]
fn replay_stall_lifts_once_recovery_completes() {
    let mut ctx = TestContext::default();
    let h = ctx.dispatch_all([load(1, 1, 2), load(2, 3, 2)]);
    ctx.core.replay(h[1]);
    assert!(ctx.core.add_inst(alu(3, 6, 7, 8)).is_err());

    ctx.execute_all();
    let _ = ctx.drain(20);
    assert!(ctx.core.add_inst(alu(3, 6, 7, 8)).is_ok());
}

// ══════════════════════════════════════════════════════════
// 3. Refusal Leaves No Trace
// ══════════════════════════════════════════════════════════

#[test]
fn refused_op_is_returned_unchanged() {
    let mut ctx = TestContext::new(config_with(16, 1));
    let _ = ctx.dispatch(alu(1, 1, 2, 3));
    let original = load(2, 4, 1);

    let stall = match ctx.core.add_inst(original.clone()) {
        Err(stall) => stall,
        Ok(_) => panic!("admitted without a free register"),
    };
    assert_eq!(stall.inst.id, original.id);
    assert_eq!(stall.inst.pc, original.pc);
    assert_eq!(stall.inst.inst, original.inst);
    assert_eq!(stall.inst.state, InstState::Fetched);
    assert_eq!(stall.inst.deps, [None, None, None]);
    assert!(!stall.inst.reg_allocated);
}

#[test]
fn repeated_refusals_are_idempotent() {
    let mut ctx = TestContext::new(config_with(16, 1));
    let h1 = ctx.dispatch(alu(1, 1, 2, 3));
    let admitted = ctx.core.stats().admitted(Opcode::Load);
    let producer = ctx.core.producer(4);

    let mut op = load(2, 4, 1);
    for _ in 0..3 {
        op = match ctx.core.add_inst(op) {
            Err(stall) => stall.inst,
            Ok(_) => panic!("admitted without a free register"),
        };
    }
    assert_eq!(ctx.core.rob_handles(), vec![h1]);
    assert_eq!(ctx.core.free_regs(), 0);
    assert_eq!(ctx.core.stats().admitted(Opcode::Load), admitted);
    assert_eq!(ctx.core.producer(4), producer);
    assert_eq!(ctx.core.cluster().added, vec![InstId(1)]);
}

#[test]
fn refusing_cluster_sees_no_add() {
    let mut cluster = MockExecCluster::new();
    cluster
        .expect_can_issue()
        .times(1)
        .returning(|_| Err(StallCause::OutstandingStores));
    cluster.expect_add_inst().never();
    let mut core = mocked_core(cluster);

    let stall = core.add_inst(store(1, 2, 3)).err();
    assert_eq!(stall.map(|s| s.cause), Some(StallCause::OutstandingStores));
    assert!(core.is_rob_empty());
}

#[test]
fn accepting_cluster_receives_renamed_op() {
    let mut cluster = MockExecCluster::new();
    cluster.expect_can_issue().times(1).returning(|_| Ok(()));
    cluster
        .expect_add_inst()
        .withf(|d| d.id == InstId(7) && d.state == InstState::Renamed)
        .times(1)
        .return_const(());
    let mut core = mocked_core(cluster);

    assert!(core.add_inst(alu(7, 1, 2, 3)).is_ok());
}

// ══════════════════════════════════════════════════════════
// 4. Register Alias Table
// ══════════════════════════════════════════════════════════

#[test]
fn consumer_depends_on_latest_producer() {
    let mut ctx = TestContext::default();
    let _p1 = ctx.dispatch(alu(1, 5, 2, 3));
    let p2 = ctx.dispatch(alu(2, 5, 2, 3));
    let c = ctx.dispatch(alu(3, 6, 5, 5));

    let deps = ctx.core.inst(c).map(|d| d.deps);
    assert_eq!(deps, Some([Some(p2), Some(p2), None]));
    assert_eq!(ctx.core.producer(6), Some(c));
}

#[test]
fn executed_producer_is_not_a_dependency() {
    let mut ctx = TestContext::default();
    let p = ctx.dispatch(alu(1, 5, 2, 3));
    ctx.execute(p);
    assert_eq!(ctx.core.producer(5), None);

    let c = ctx.dispatch(alu(2, 6, 5, 2));
    assert_eq!(ctx.core.inst(c).map(|d| d.deps[0]), Some(None));
}

#[test]
fn late_src2_skips_second_dependency() {
    let mut ctx = TestContext::default();
    let p = ctx.dispatch(alu(1, 5, 2, 3));
    let st = InstBuilder::new(2, Opcode::Store)
        .src1(5)
        .src2(5)
        .late_src2()
        .build();
    let h = ctx.dispatch(st);
    assert_eq!(ctx.core.inst(h).map(|d| d.deps), Some([Some(p), None, None]));
}

#[test]
fn zero_register_has_no_producer() {
    let mut ctx = TestContext::default();
    let _ = ctx.dispatch(alu(1, 0, 2, 3));
    let c = ctx.dispatch(alu(2, 4, 0, 0));
    assert_eq!(ctx.core.producer(0), None);
    assert_eq!(ctx.core.inst(c).map(|d| d.deps[0]), Some(None));
}

#[test]
fn second_destination_is_tracked() {
    let mut ctx = TestContext::default();
    let p = ctx.dispatch(InstBuilder::new(1, Opcode::Div).dst(3).dst2(4).build());
    assert_eq!(ctx.core.producer(3), Some(p));
    assert_eq!(ctx.core.producer(4), Some(p));
}

// ══════════════════════════════════════════════════════════
// 5. Load Classification
// ══════════════════════════════════════════════════════════

#[test]
fn load_into_empty_rob_is_safe() {
    let mut ctx = TestContext::default();
    let h = ctx.dispatch(load(1, 1, 2));
    let d = ctx.core.inst(h).map(|d| (d.is_spec, d.is_safe));
    assert_eq!(d, Some((false, true)));
    assert_eq!(ctx.core.stats().safe_loads, 1);
}

#[test]
fn load_behind_waiting_store_is_speculative() {
    let mut ctx = TestContext::default();
    let _ = ctx.dispatch(store(1, 2, 3));
    let h = ctx.dispatch(load(2, 1, 2));
    assert_eq!(ctx.core.inst(h).map(|d| d.is_spec), Some(true));
    assert_eq!(ctx.core.stats().spec_loads, 1);
}

#[test]
fn load_behind_executing_store_is_safe() {
    let mut ctx = TestContext::default();
    let st = ctx.dispatch(store(1, 2, 3));
    ctx.core.executing(st);
    let h = ctx.dispatch(load(2, 1, 2));
    assert_eq!(ctx.core.inst(h).map(|d| d.is_safe), Some(true));
}

#[rstest]
#[case::branch(Opcode::Branch)]
#[case::divide(Opcode::Div)]
#[case::fp_divide(Opcode::FpDiv)]
fn load_behind_unresolved_control_is_speculative(#[case] opcode: Opcode) {
    let mut ctx = TestContext::default();
    let older = ctx.dispatch(InstBuilder::new(1, opcode).src1(2).build());
    // Executing is not enough: the result is still unknown.
    ctx.core.executing(older);
    let h = ctx.dispatch(load(2, 1, 2));
    assert_eq!(ctx.core.inst(h).map(|d| d.is_spec), Some(true));
}

#[test]
fn load_behind_resolved_ops_is_safe() {
    let mut ctx = TestContext::default();
    let b = ctx.dispatch(branch(1, 2, 3));
    // A multiply is not long-latency for classification purposes.
    let _ = ctx.dispatch(InstBuilder::new(2, Opcode::Mult).dst(4).build());
    ctx.execute(b);
    let h = ctx.dispatch(load(3, 1, 2));
    assert_eq!(ctx.core.inst(h).map(|d| d.is_safe), Some(true));
}

// ══════════════════════════════════════════════════════════
// 6. Register Allocation
// ══════════════════════════════════════════════════════════

#[test]
fn early_allocation_released_at_commit() {
    let mut ctx = TestContext::new(config_with(16, 4));
    let h = ctx.dispatch(alu(1, 1, 2, 3));
    assert_eq!(ctx.core.free_regs(), 3);
    assert_eq!(ctx.core.inst(h).map(|d| d.reg_allocated), Some(true));

    ctx.execute(h);
    let _ = ctx.drain(10);
    assert_eq!(ctx.core.free_regs(), 4);
}

#[test]
fn late_allocation_happens_once_at_execution() {
    let config = CoreConfig {
        late_alloc_register: true,
        ..config_with(16, 2)
    };
    let mut ctx = TestContext::new(config);
    let h = ctx.dispatch(alu(1, 1, 2, 3));
    assert_eq!(ctx.core.free_regs(), 2);

    ctx.core.executing(h);
    ctx.core.executing(h);
    assert_eq!(ctx.core.free_regs(), 1);

    ctx.core.executed(h);
    let _ = ctx.drain(10);
    assert_eq!(ctx.core.free_regs(), 2);
}
