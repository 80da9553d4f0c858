//! The fixed-point engine. Each iteration runs every enabled pass in a fixed
//! priority order; the run stops at the first iteration in which no pass
//! changes the tree, or after a hard cap for inputs that never settle. A
//! failing pass is logged and skipped for the iteration so one broken
//! recognizer cannot abort the whole run; the rotation budget is the one
//! fatal exception, since it means a recognized pool can never be decoded
//! faithfully.

use alembic_core::{parser, printer, Ast, ScopeIndex};
use serde::Serialize;
use tracing::{debug, error};

use crate::anti_tamper::AntiTamperRemover;
use crate::config::Config;
use crate::constant_propagation::ConstantPropagator;
use crate::control_flow::ControlFlowRecoverer;
use crate::dead_branches::DeadBranchRemover;
use crate::expressions::ExpressionSimplifier;
use crate::object_packing::ObjectPacker;
use crate::objects::ObjectSimplifier;
use crate::properties::PropertySimplifier;
use crate::proxy_functions::ProxyFunctionInliner;
use crate::reassignments::ReassignmentRemover;
use crate::sequences::SequenceSplitter;
use crate::strings::StringRevealer;
use crate::unused_variables::UnusedVariableRemover;
use crate::{Error, PassContext, Result, Transform};

const MAX_ITERATIONS: usize = 50;

/// One slot in the pipeline: a pass and the config switch that enables it.
struct ScheduledPass {
    transform: Box<dyn Transform>,
    enabled: fn(&Config) -> bool,
}

/// The pipeline in priority order. Cheap cleanups run first so the
/// pattern-heavy passes see a smaller tree, the string revealer runs late so
/// wrapper call sites are literal by the time it decodes them, and
/// tamper-guard stripping sits last behind its own switch.
fn pipeline() -> Vec<ScheduledPass> {
    fn slot(transform: Box<dyn Transform>, enabled: fn(&Config) -> bool) -> ScheduledPass {
        ScheduledPass { transform, enabled }
    }
    vec![
        slot(Box::new(UnusedVariableRemover), |c| {
            c.unused_variable_removal
        }),
        slot(Box::new(ConstantPropagator), |c| c.constant_propagation),
        slot(Box::new(ReassignmentRemover), |c| c.reassignment_removal),
        slot(Box::new(DeadBranchRemover), |c| c.dead_branch_removal),
        slot(Box::new(ObjectPacker), |c| c.object_packing),
        slot(Box::new(ProxyFunctionInliner), |c| c.proxy_function_inlining),
        slot(Box::new(ExpressionSimplifier), |c| {
            c.expression_simplification
        }),
        slot(Box::new(SequenceSplitter), |c| c.sequence_splitting),
        slot(Box::new(ControlFlowRecoverer), |c| c.control_flow_recovery),
        slot(Box::new(PropertySimplifier), |c| c.property_simplification),
        slot(Box::new(ObjectSimplifier), |c| c.object_simplification),
        slot(Box::new(StringRevealer), |c| c.string_revealing),
        slot(Box::new(AntiTamperRemover), |c| c.anti_tamper_removal),
    ]
}

/// What a run did: iterations consumed and how often each pass fired.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub iterations: usize,
    pub passes: Vec<PassReport>,
}

/// Change count for one pass over the whole run.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub name: &'static str,
    pub changes: usize,
}

impl RunSummary {
    fn new(passes: &[ScheduledPass]) -> Self {
        Self {
            iterations: 0,
            passes: passes
                .iter()
                .map(|pass| PassReport {
                    name: pass.transform.name(),
                    changes: 0,
                })
                .collect(),
        }
    }
}

/// Drives the pass pipeline over one tree.
pub struct Deobfuscator {
    passes: Vec<ScheduledPass>,
}

impl Default for Deobfuscator {
    fn default() -> Self {
        Self::new()
    }
}

impl Deobfuscator {
    pub fn new() -> Self {
        Self::with_passes(pipeline())
    }

    fn with_passes(passes: Vec<ScheduledPass>) -> Self {
        Self { passes }
    }

    /// Runs the enabled passes to a fixed point, mutating the tree in place.
    ///
    /// The binding index is rebuilt lazily: a pass that fires and declares
    /// invalidation drops the cached index, and the next pass rebuilds it on
    /// first use. A pass error other than the rotation budget is downgraded
    /// to "no change"; the index is dropped then too, because the pass may
    /// have mutated the tree before failing.
    pub fn run(&self, ast: &mut Ast, config: &Config) -> Result<RunSummary> {
        let mut summary = RunSummary::new(&self.passes);
        let mut scopes: Option<ScopeIndex> = None;
        for iteration in 0..MAX_ITERATIONS {
            let mut productive = false;
            for (slot, pass) in self.passes.iter().enumerate() {
                if !(pass.enabled)(config) {
                    continue;
                }
                let name = pass.transform.name();
                let result = {
                    let index = scopes.get_or_insert_with(|| ScopeIndex::build(ast));
                    let cx = PassContext {
                        scopes: index,
                        config,
                    };
                    pass.transform.apply(ast, &cx)
                };
                let changed = match result {
                    Ok(changed) => changed,
                    Err(Error::RotationBudget) => return Err(Error::RotationBudget),
                    Err(error) => {
                        error!(pass = name, %error, "pass failed, treated as no change");
                        scopes = None;
                        false
                    }
                };
                if changed {
                    debug!(iteration, pass = name, "pass changed the tree");
                    summary.passes[slot].changes += 1;
                    productive = true;
                    if pass.transform.invalidates_bindings() {
                        scopes = None;
                    }
                }
            }
            summary.iterations = iteration + 1;
            if !productive {
                break;
            }
        }
        Ok(summary)
    }
}

/// Parses a program, runs the full pipeline on it, and reprints it.
pub fn deobfuscate(source: &str, config: &Config) -> Result<String> {
    let mut ast = parser::parse(source)?;
    let summary = Deobfuscator::new().run(&mut ast, config)?;
    debug!(iterations = summary.iterations, "run settled");
    Ok(printer::print(&ast))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reprint(source: &str) -> String {
        printer::print(&parser::parse(source).unwrap())
    }

    #[test]
    fn a_quiet_program_settles_in_one_iteration() {
        let mut ast = parser::parse("work();").unwrap();
        let summary = Deobfuscator::new()
            .run(&mut ast, &Config::default())
            .unwrap();
        assert_eq!(summary.iterations, 1);
        assert_eq!(printer::print(&ast), reprint("work();"));
    }

    #[test]
    fn passes_compose_across_iterations() {
        let source = "
            function main() {
                function add(x, y) {
                    return x + y;
                }
                var a = 2;
                log(add(a, 3));
            }
            main();
        ";
        let out = deobfuscate(source, &Config::default()).unwrap();
        assert_eq!(
            out,
            reprint("function main() { log(5); } main();")
        );
    }

    #[test]
    fn a_disabled_pass_leaves_its_work_undone() {
        let source = "var a = 5;\nf(a);";
        let config = Config {
            constant_propagation: false,
            ..Config::default()
        };
        let out = deobfuscate(source, &config).unwrap();
        assert_eq!(out, reprint(source));

        let out = deobfuscate(source, &Config::default()).unwrap();
        assert_eq!(out, reprint("f(5);"));
    }

    #[test]
    fn the_iteration_cap_stops_a_restless_pass() {
        struct Restless;
        impl Transform for Restless {
            fn name(&self) -> &'static str {
                "Restless"
            }
            fn apply(&self, _ast: &mut Ast, _cx: &PassContext) -> Result<bool> {
                Ok(true)
            }
        }
        let engine = Deobfuscator::with_passes(vec![ScheduledPass {
            transform: Box::new(Restless),
            enabled: |_| true,
        }]);
        let mut ast = parser::parse("x();").unwrap();
        let summary = engine.run(&mut ast, &Config::default()).unwrap();
        assert_eq!(summary.iterations, MAX_ITERATIONS);
        assert_eq!(summary.passes[0].changes, MAX_ITERATIONS);
    }

    #[test]
    fn a_rotation_that_cannot_settle_aborts_the_run() {
        let source = "
            function pool() {
                var data = ['x', 'y', 'z'];
                pool = function () {
                    return data;
                };
                return pool();
            }
            function decode(index, extra) {
                var values = pool();
                decode = function (i, u) {
                    i = i - 0;
                    var value = values[i];
                    return value;
                };
                return decode(index, extra);
            }
            (function (get, target) {
                var arr = get();
                while (true) {
                    try {
                        var probe = parseInt(decode(0)) + 0;
                        if (probe === target) {
                            break;
                        } else {
                            arr.push(arr.shift());
                        }
                    } catch (e) {
                        arr.push(arr.shift());
                    }
                }
            })(pool, 9);
            log(decode(1));
        ";
        assert!(matches!(
            deobfuscate(source, &Config::default()),
            Err(Error::RotationBudget)
        ));
    }

    #[test]
    fn tamper_guards_go_only_when_asked() {
        let source = "
            var guard = (function () {
                var armed = true;
                return function (target, body) {
                    var handler = armed ? function () {
                        if (body) {
                            var result = body.apply(target, arguments);
                            body = null;
                            return result;
                        }
                    } : function () {};
                    armed = false;
                    return handler;
                };
            })();
            var probe = guard(this, function () {
                return probe.toString().search('((.+)+)$');
            });
            probe();
            work();
        ";
        let kept = deobfuscate(source, &Config::default()).unwrap();
        assert_eq!(kept, reprint(source));

        let config = Config {
            anti_tamper_removal: true,
            ..Config::default()
        };
        let stripped = deobfuscate(source, &config).unwrap();
        assert_eq!(stripped, reprint("work();"));
    }
}
