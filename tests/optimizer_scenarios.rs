//! End-to-end scenarios for the jump optimizer.
//!
//! Drives whole modules through the public entry points and checks the
//! pipeline-level guarantees: labels stay unique, nothing references a
//! label that is gone, no new branch targets appear, and the result is a
//! fixpoint.

use std::collections::HashSet;

use tern_asm::asm::{Function, Instruction, LabelRef, Module, Operand, TestOp};
use tern_asm::opt::{clean_module, labels_of, optimize_module};

fn fi() -> Instruction {
    Instruction::FuncInfo {
        module: "demo".into(),
        function: "f".into(),
        arity: 2,
    }
}

fn lbl(n: u32) -> Instruction {
    Instruction::Label(n)
}

fn jump(n: u32) -> Instruction {
    Instruction::Jump(LabelRef(n))
}

fn ret() -> Instruction {
    Instruction::Return
}

fn mov(src: u32, dst: u32) -> Instruction {
    Instruction::Move {
        src: Operand::X(src),
        dst: Operand::X(dst),
    }
}

fn test(op: TestOp, fail: u32) -> Instruction {
    Instruction::Test {
        op,
        fail: LabelRef(fail),
        args: vec![Operand::X(0), Operand::X(1)],
    }
}

fn module_of(body: Vec<Instruction>) -> Module {
    Module::new("demo").with_function(Function::new("f", 2, 1, body))
}

fn defined_labels(body: &[Instruction]) -> Vec<u32> {
    body.iter().filter_map(|i| i.defined_label()).collect()
}

fn referenced_labels(body: &[Instruction]) -> HashSet<u32> {
    body.iter().flat_map(|i| labels_of(i)).collect()
}

/// The §-level guarantees every optimized function must satisfy.
fn assert_well_formed(input: &Function, output: &Function) {
    let defined = defined_labels(&output.body);
    let mut unique = defined.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(defined.len(), unique.len(), "a label is defined twice");

    let referenced = referenced_labels(&output.body);
    for l in &referenced {
        assert!(
            defined.contains(l),
            "label {} is referenced but not defined",
            l
        );
    }

    let fc = match output.body.get(1) {
        Some(Instruction::Label(l)) => *l,
        other => panic!("function-class label missing: {:?}", other),
    };
    for l in &defined {
        assert!(
            *l == output.entry || *l == fc || referenced.contains(l),
            "label {} survives without a reference",
            l
        );
    }

    let before = referenced_labels(&input.body);
    for l in &referenced {
        assert!(before.contains(l), "label {} was invented", l);
    }
}

fn optimize_and_check(body: Vec<Instruction>) -> Vec<Instruction> {
    let module = module_of(body);
    let optimized = optimize_module(module.clone()).expect("optimization failed");
    assert_well_formed(&module.functions[0], &optimized.functions[0]);

    // Idempotence: the pipeline has nothing left to do on its own output.
    let again = optimize_module(optimized.clone()).expect("re-optimization failed");
    assert_eq!(again, optimized, "optimize is not a fixpoint");

    // Round-trip: cleanup alone finds nothing either.
    let cleaned = clean_module(optimized.clone()).expect("cleanup failed");
    assert_eq!(cleaned, optimized, "cleanup undid the pipeline");

    // Determinism.
    let replay = optimize_module(module).expect("replay failed");
    assert_eq!(replay, optimized);

    optimized.functions.into_iter().next().expect("one function").body
}

#[test]
fn shared_tails_merge_and_the_test_inverts() {
    let body = vec![
        fi(),
        lbl(1),
        test(TestOp::IsEq, 2),
        jump(3),
        lbl(2),
        mov(0, 1),
        ret(),
        lbl(3),
        mov(0, 1),
        ret(),
    ];
    let out = optimize_and_check(body);
    // Sharing turns label 2's body into a jump to label 3 and the peephole
    // merges the two labels. With both arms at one position the test
    // decides nothing: the next round finds it branching to the label that
    // starts right after it and deletes it, and cleanup retires the labels.
    assert_eq!(out, vec![fi(), lbl(1), mov(0, 1), ret()]);
}

#[test]
fn cold_exit_moves_behind_the_hot_path() {
    let body = vec![
        fi(),
        lbl(1),
        Instruction::Test {
            op: TestOp::IsNil,
            fail: LabelRef(3),
            args: vec![Operand::X(0)],
        },
        jump(4),
        lbl(3),
        Instruction::Badmatch(Operand::X(0)),
        lbl(4),
        mov(0, 1),
        ret(),
    ];
    let out = optimize_and_check(body);
    assert_eq!(
        out,
        vec![
            fi(),
            lbl(1),
            Instruction::Test {
                op: TestOp::IsNil,
                fail: LabelRef(3),
                args: vec![Operand::X(0)],
            },
            mov(0, 1),
            ret(),
            lbl(3),
            Instruction::Badmatch(Operand::X(0)),
        ]
    );
}

#[test]
fn unreachable_tail_disappears() {
    let body = vec![
        fi(),
        lbl(1),
        ret(),
        mov(0, 1),
        ret(),
        lbl(9),
        ret(),
    ];
    let out = optimize_and_check(body);
    assert_eq!(out, vec![fi(), lbl(1), ret()]);
}

#[test]
fn minimal_function_round_trips() {
    let body = vec![fi(), lbl(1), ret()];
    let out = optimize_and_check(body.clone());
    assert_eq!(out, body);
}

#[test]
fn backward_receive_target_survives_a_merge() {
    let body = vec![
        fi(),
        lbl(1),
        Instruction::Wait(LabelRef(3)),
        lbl(3),
        jump(4),
        lbl(4),
        ret(),
    ];
    let out = optimize_and_check(body);
    // Label 3 is referenced by the wait, so it keeps a definition at its
    // merged position; label 4 loses its last reference and goes away.
    assert_eq!(
        out,
        vec![fi(), lbl(1), Instruction::Wait(LabelRef(3)), lbl(3), ret()]
    );
}

#[test]
fn module_record_is_forwarded_verbatim() {
    let mut module = module_of(vec![fi(), lbl(1), jump(2), lbl(2), ret()]);
    module.exports.push(tern_asm::asm::Export {
        name: "f".into(),
        arity: 2,
        label: 1,
    });
    module.attributes.push(tern_asm::asm::Attribute {
        name: "vsn".into(),
        value: "1".into(),
    });
    module.literal_count = 17;

    let out = optimize_module(module.clone()).expect("optimization failed");
    assert_eq!(out.name, module.name);
    assert_eq!(out.exports, module.exports);
    assert_eq!(out.attributes, module.attributes);
    assert_eq!(out.literal_count, 17);
    assert_eq!(out.functions[0].name, "f");
    assert_eq!(out.functions[0].arity, 2);
    assert_eq!(out.functions[0].entry, 1);
}

#[test]
fn label_cleanup_alone_strips_orphans() {
    let module = module_of(vec![fi(), lbl(1), ret(), lbl(7), mov(0, 1), ret()]);
    let out = clean_module(module).expect("cleanup failed");
    assert_eq!(out.functions[0].body, vec![fi(), lbl(1), ret()]);
}

#[test]
fn functions_are_optimized_independently_in_order() {
    let module = Module::new("demo")
        .with_function(Function::new(
            "a",
            0,
            1,
            vec![fi(), lbl(1), jump(2), lbl(2), ret()],
        ))
        .with_function(Function::new(
            "b",
            0,
            3,
            vec![fi(), lbl(3), ret(), lbl(4), ret()],
        ));
    let out = optimize_module(module).expect("optimization failed");
    assert_eq!(out.functions.len(), 2);
    assert_eq!(out.functions[0].name, "a");
    assert_eq!(out.functions[0].body, vec![fi(), lbl(1), ret()]);
    assert_eq!(out.functions[1].name, "b");
    assert_eq!(out.functions[1].body, vec![fi(), lbl(3), ret()]);
}
