//! `vcov check`: elaborate and print the instance tree.

use std::path::Path;

use vcov_diagnostics::DiagnosticSink;
use vcov_model::{Design, InstId};

use crate::pipeline::{elaborate, load_design, load_sources, render_diagnostics, resolve_config};
use crate::{CheckArgs, GlobalArgs};

/// Runs the command. Returns exit code 0 when elaboration succeeds.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = resolve_config(global)?;
    let mut design = load_design(Path::new(&args.design))?;
    let sources = load_sources(&design);
    let sink = DiagnosticSink::new();

    let root = elaborate(&mut design, args.top.as_deref(), &config, &sources, &sink);
    render_diagnostics(&sink, &sources, global.color);
    let Some(root) = root else {
        return Ok(1);
    };
    if !global.quiet {
        print!("{}", instance_tree(&design, root));
    }
    Ok(0)
}

/// One line per instance, indented by depth, listing generated statements.
pub fn instance_tree(design: &Design, root: InstId) -> String {
    let mut out = String::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((inst, depth)) = stack.pop() {
        let instance = &design.instances[inst];
        let unit = &design.funits[instance.funit];
        out.push_str(&format!("{}{} ({})", "  ".repeat(depth), instance.name, unit.name));
        let generated = instance.statements().count();
        if generated > 0 {
            out.push_str(&format!(" [{generated} generated statement(s)]"));
        }
        out.push('\n');
        for child in instance.children.iter().rev() {
            stack.push((*child, depth + 1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcov_model::{DesignBuilder, Instantiation, SignalKind};

    #[test]
    fn tree_lists_nested_instances() {
        let src = "module top;\n  wire a;\n  sub u1();\n  sub u2();\nendmodule\nmodule sub;\nendmodule\n";
        let mut b = DesignBuilder::new("top.v", src);
        let top = b.module("top");
        let sub = b.module("sub");
        b.signal(top, "a", SignalKind::Wire);
        let d = b.design_mut();
        d.funits[top].instances.push(Instantiation::new("u1", sub));
        d.funits[top].instances.push(Instantiation::new("u2", sub));
        let mut d = b.finish();
        let root = vcov_elaborate::elaborate(&mut d, Some("top"), 10).unwrap();
        assert_eq!(instance_tree(&d, root), "top (top)\n  u1 (sub)\n  u2 (sub)\n");
    }
}
