use std::fs;
use vcov_config::CoverageConfig;
use vcov_diagnostics::DiagnosticSink;
use vcov_elaborate::elaborate;
use vcov_inline::{instance_id_fragment, instrument_design, instrument_source, NoAssertions};
use vcov_model::{Design, DesignBuilder, ExprOp, Fsm, FunctionalUnit, FunitKind, GenElem, SignalKind};
use vcov_source::SourceDb;

const AND_SRC: &str = "module top;\n  wire a, b, x;\n  assign x = a & b;\nendmodule\n";

fn and_design() -> Design {
    let mut b = DesignBuilder::new("top.v", AND_SRC);
    let top = b.module("top");
    let [a, bs, x] = ["a", "b", "x"].map(|n| b.signal(top, n, SignalKind::Wire));
    let ex = b.sig(x, 3, 0);
    let ea = b.sig(a, 3, 0);
    let eb = b.sig(bs, 3, 0);
    let and = b.binary(ExprOp::And, ea, eb);
    b.assign(top, ExprOp::Assign, ex, and);
    let mut d = b.finish();
    elaborate(&mut d, Some("top"), 100).unwrap();
    d
}

#[test]
fn two_input_and_gets_polarity_and_line_coverage() {
    let d = and_design();
    let config = CoverageConfig::default();
    let (text, stats) = instrument_source(&d, &config, &NoAssertions, "top.v", AND_SRC).unwrap();
    let expected = "module top;\n\
                    wire [1:0] \\covered$C3_3_000e0012 ;\n\
                    wire \\covered$L3_3_000a0012 ;\n  \
                    wire a, b, x;\n  \
                    assign x = a & b, \\covered$C3_3_000e0012 = {(a > 0), (b > 0)}, \\covered$L3_3_000a0012 = 1'b1;\n\
                    parameter \\covered$inst_id = 0;\n\
                    endmodule\n";
    assert_eq!(text, expected);
    assert_eq!(stats.modules, 1);
    assert_eq!(stats.statements, 1);
    assert_eq!(stats.points, 2);
}

#[test]
fn disabled_metrics_leave_statements_alone() {
    let d = and_design();
    let mut config = CoverageConfig::default();
    config.coverage = vcov_config::ScoredMetrics::none();
    let (text, stats) = instrument_source(&d, &config, &NoAssertions, "top.v", AND_SRC).unwrap();
    assert_eq!(
        text,
        "module top;\n  wire a, b, x;\n  assign x = a & b;\nparameter \\covered$inst_id = 0;\nendmodule\n"
    );
    assert_eq!(stats.points, 0);
}

const EVENT_SRC: &str = "module top;\n  reg clk, q, d;\n  always @(posedge clk) q <= d;\nendmodule\n";

#[test]
fn event_control_captures_edge_and_statement_gets_line_hit() {
    let mut b = DesignBuilder::new("top.v", EVENT_SRC);
    let top = b.module("top");
    let [clk, q, dd] = ["clk", "q", "d"].map(|n| b.signal(top, n, SignalKind::Reg));
    let eclk = b.sig(clk, 3, 0);
    let kw = b.find(3, "posedge", 0);
    let last = b.design().exprs[eclk].span.last();
    let edge = b.node(ExprOp::Posedge, kw, last, Some(eclk), None);
    let at = b.find(3, "@", 0);
    let end = b.find(3, ";", 0);
    b.compound(top, ExprOp::EventCtrl, at, Some(edge), None, end);
    let eq = b.sig(q, 3, 0);
    let ed = b.sig(dd, 3, 0);
    b.assign(top, ExprOp::NbAssign, eq, ed);
    let mut d = b.finish();
    elaborate(&mut d, Some("top"), 100).unwrap();

    let config = CoverageConfig::default();
    let (text, _) = instrument_source(&d, &config, &NoAssertions, "top.v", EVENT_SRC).unwrap();
    let expected = "module top;\n\
                    reg \\covered$E3_3_000a0017 ;\n\
                    reg \\covered$L3_3_0019001e ;\n  \
                    reg clk, q, d;\n  \
                    always @(posedge clk) begin \\covered$E3_3_000a0017 = (clk === 1'b1); \
                    begin q <= d; \\covered$L3_3_0019001e = 1'b1; end end\n\
                    parameter \\covered$inst_id = 0;\n\
                    endmodule\n";
    assert_eq!(text, expected);
}

const TRIGGER_SRC: &str = "module top;\n  event ev;\n  always -> ev;\nendmodule\n";

#[test]
fn event_declaration_becomes_reg_and_trigger_toggles_it() {
    let mut b = DesignBuilder::new("top.v", TRIGGER_SRC);
    let top = b.module("top");
    let ev = b.signal(top, "ev", SignalKind::Event);
    let eev = b.sig(ev, 3, 0);
    let arrow = b.find(3, "->", 0);
    let last = b.design().exprs[eev].span.last();
    let root = b.node(ExprOp::Trigger, arrow, last, Some(eev), None);
    b.simple(top, root);
    let mut d = b.finish();
    elaborate(&mut d, Some("top"), 100).unwrap();

    let config = CoverageConfig::default();
    let (text, stats) = instrument_source(&d, &config, &NoAssertions, "top.v", TRIGGER_SRC).unwrap();
    let expected = "module top;\n\
                    reg \\covered$L3_3_000a000e ;\n  \
                    reg ev;\n  \
                    always begin ev = (ev === 1'bx) ? 1'b0 : ~ev; \\covered$L3_3_000a000e = 1'b1; end\n\
                    parameter \\covered$inst_id = 0;\n\
                    endmodule\n";
    assert_eq!(text, expected);
    assert_eq!(stats.statements, 1);

    // Without event coverage the declaration and the trigger stay as written.
    let mut config = CoverageConfig::default();
    config.coverage.event = false;
    let (text, _) = instrument_source(&d, &config, &NoAssertions, "top.v", TRIGGER_SRC).unwrap();
    assert!(text.contains("  event ev;\n"));
    assert!(text.contains("always begin -> ev; \\covered$L3_3_000a000e = 1'b1; end\n"));
}

const FSM_SRC: &str = "module top;\n  reg [1:0] state, next;\n  if (1) begin : g\n    reg [1:0] s;\n  end\nendmodule\n";

#[test]
fn state_captures_close_their_scope() {
    let mut b = DesignBuilder::new("top.v", FSM_SRC);
    let top = b.module("top");
    let g = b.generate_block(top, "g");
    let state = b.vector(top, "state", SignalKind::Reg, 1, 0);
    let next = b.vector(top, "next", SignalKind::Reg, 1, 0);
    let s = b.vector(g, "s", SignalKind::Reg, 1, 0);
    let from = b.sig(state, 2, 0);
    let to = b.sig(next, 2, 0);
    let own = b.sig(s, 4, 0);
    let cond = b.lit("1", 3, 0);
    let g_if = b.gen(GenElem::Expr(cond));
    let g_ns = b.gen(GenElem::Namespace { funit: g, varname: None });
    let d = b.design_mut();
    d.funits[top].fsms.push(Fsm {
        from_state: from,
        to_state: to,
    });
    d.funits[g].fsms.push(Fsm {
        from_state: own,
        to_state: own,
    });
    d.gen_items.set_branches(g_if, Some(g_ns), None);
    d.funits[top].gen_roots.push(g_if);
    let mut d = b.finish();
    elaborate(&mut d, Some("top"), 100).unwrap();

    let config = CoverageConfig::default();
    let (text, stats) = instrument_source(&d, &config, &NoAssertions, "top.v", FSM_SRC).unwrap();
    let expected = "module top;\n  \
                    reg [1:0] state, next;\n  \
                    if (1) begin : g\n    \
                    reg [1:0] s;\n  \
                    wire [1:0] \\covered$F4_4_000f000f = s;\n\
                    end\n\
                    wire [3:0] \\covered$F2_2_000d0011 = {state, next};\n\
                    parameter \\covered$inst_id = 0;\n\
                    endmodule\n";
    assert_eq!(text, expected);
    assert_eq!(stats.points, 2);
}

const CALL_SRC: &str = "module top;\n  reg a, y;\n  always if (f(a) < 2) y = a;\nendmodule\n";

#[test]
fn function_call_is_evaluated_once_through_a_temporary() {
    let mut b = DesignBuilder::new("top.v", CALL_SRC);
    let top = b.module("top");
    let f = b
        .design_mut()
        .add_funit(FunctionalUnit::new("f", FunitKind::Function), Some(top));
    let [a, y] = ["a", "y"].map(|n| b.signal(top, n, SignalKind::Reg));
    let arg = b.sig(a, 3, 0);
    let call = b.call(f, 3, 0, Some(arg));
    let two = b.lit("2", 3, 0);
    let lt = b.binary(ExprOp::Lt, call, two);
    let kw = b.find(3, "if", 0);
    let end = b.find(3, ";", 0);
    b.compound(top, ExprOp::If, kw, Some(lt), None, end);
    let ey = b.sig(y, 3, 0);
    let ea = b.sig(a, 3, 1);
    b.assign(top, ExprOp::BAssign, ey, ea);
    let mut d = b.finish();
    elaborate(&mut d, Some("top"), 100).unwrap();

    let config = CoverageConfig::default();
    let (text, stats) = instrument_source(&d, &config, &NoAssertions, "top.v", CALL_SRC).unwrap();
    let expected = "module top;\n\
                    reg \\covered$L3_3_000a0016 ;\n\
                    reg \\covered$X3_3_000e0011 ;\n\
                    reg \\covered$C3_3_000e0015 ;\n\
                    reg \\covered$L3_3_0018001c ;\n  \
                    reg a, y;\n  \
                    always begin \\covered$L3_3_000a0016 = 1'b1; \\covered$X3_3_000e0011 = f(a); \
                    \\covered$C3_3_000e0015 = (\\covered$X3_3_000e0011  < 2); \
                    if (\\covered$X3_3_000e0011  < 2) begin y = a; \\covered$L3_3_0018001c = 1'b1; end end\n\
                    parameter \\covered$inst_id = 0;\n\
                    endmodule\n";
    assert_eq!(text, expected);
    assert_eq!(stats.statements, 2);
    // The temporary is not a coverage point.
    assert_eq!(stats.points, 3);
}

const LOOP_SRC: &str = "module top;\n  genvar i;\n  for (i = 0; i < 4; i = i + 1) begin : blk\n    reg r;\n    always r = 1'b0;\n  end\nendmodule\n";

fn loop_design() -> Design {
    let mut b = DesignBuilder::new("top.v", LOOP_SRC);
    let top = b.module("top");
    let blk = b.generate_block(top, "blk");
    let i = b.signal(top, "i", SignalKind::Genvar);
    let r = b.signal(blk, "r", SignalKind::Reg);

    let i0 = b.sig(i, 3, 0);
    let zero = b.lit("0", 3, 0);
    let init = b.binary(ExprOp::GenAssign, i0, zero);
    let i1 = b.sig(i, 3, 1);
    let four = b.lit("4", 3, 0);
    let test = b.binary(ExprOp::Lt, i1, four);
    let i2 = b.sig(i, 3, 2);
    let i3 = b.sig(i, 3, 3);
    let one = b.lit("1", 3, 0);
    let sum = b.binary(ExprOp::Add, i3, one);
    let incr = b.binary(ExprOp::GenAssign, i2, sum);

    let er = b.sig(r, 5, 0);
    let low = b.lit("1'b0", 5, 0);
    let stmt = b.assign(blk, ExprOp::BAssign, er, low);
    b.detach(stmt);

    let g_init = b.gen(GenElem::Expr(init));
    let g_test = b.gen(GenElem::Expr(test));
    let g_ns = b.gen(GenElem::Namespace {
        funit: blk,
        varname: Some("i".into()),
    });
    let g_r = b.gen(GenElem::Signal(r));
    let g_stmt = b.gen(GenElem::Stmt(stmt));
    let g_incr = b.gen(GenElem::Expr(incr));
    let d = b.design_mut();
    d.gen_items.set_next(g_init, g_test);
    d.gen_items.set_branches(g_test, Some(g_ns), None);
    d.gen_items.set_branches(g_ns, Some(g_r), Some(g_incr));
    d.gen_items.set_next(g_r, g_stmt);
    d.gen_items.set_next(g_incr, g_test);
    d.funits[top].gen_roots.push(g_init);
    let mut d = b.finish();
    elaborate(&mut d, Some("top"), 1000).unwrap();
    d
}

#[test]
fn generate_loop_is_elaborated_once_per_iteration_and_instrumented_once() {
    let d = loop_design();
    let top = d.find_module("top").unwrap();
    let root = vcov_elaborate::instances_of(&d, top)[0];
    let children = &d.instances[root].children;
    assert_eq!(children.len(), 4);
    let names: Vec<String> = children.iter().map(|c| d.hierarchical_name(*c)).collect();
    assert_eq!(names, vec!["top.blk[0]", "top.blk[1]", "top.blk[2]", "top.blk[3]"]);
    for child in children {
        assert_eq!(d.instances[*child].statements().count(), 1);
        assert_eq!(d.instances[*child].signals().count(), 1);
    }

    let config = CoverageConfig::default();
    let (text, stats) = instrument_source(&d, &config, &NoAssertions, "top.v", LOOP_SRC).unwrap();
    let expected = "module top;\n  \
                    genvar i;\n  \
                    for (i = 0; i < 4; i = i + 1) begin : blk\n\
                    reg \\covered$L5_5_000c0013 ;\n    \
                    reg r;\n    \
                    always begin r = 1'b0; \\covered$L5_5_000c0013 = 1'b1; end\n  \
                    end\n\
                    parameter \\covered$inst_id = 0;\n\
                    endmodule\n";
    assert_eq!(text, expected);
    assert_eq!(stats.statements, 1);
}

#[test]
fn design_run_writes_files_and_instance_ids() {
    let d = loop_design();
    let mut sources = SourceDb::new();
    sources.add_source("top.v", LOOP_SRC.to_string());
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("covered");
    let config = CoverageConfig::default();
    let sink = DiagnosticSink::new();

    let summary = instrument_design(&d, &sources, &config, &NoAssertions, &sink, &out).unwrap();
    assert_eq!(summary.files, 1);
    assert_eq!(summary.instances, 1);
    assert!(!sink.has_errors());

    let written = fs::read_to_string(out.join("top.v")).unwrap();
    assert!(written.contains("always begin r = 1'b0;"));
    let ids = fs::read_to_string(out.join(&config.output.instance_ids)).unwrap();
    assert_eq!(ids, "defparam top.\\covered$inst_id  = 0;\n");
    assert_eq!(ids, instance_id_fragment(&d));
}

#[test]
fn missing_source_is_an_error() {
    let d = and_design();
    let sources = SourceDb::new();
    let dir = tempfile::tempdir().unwrap();
    let sink = DiagnosticSink::new();
    let err = instrument_design(
        &d,
        &sources,
        &CoverageConfig::default(),
        &NoAssertions,
        &sink,
        dir.path(),
    )
    .unwrap_err();
    assert_eq!(err.to_diagnostic().code, vcov_inline::errors::E403);
}
