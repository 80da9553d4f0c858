use alembic_core::parser::parse;
use alembic_core::scope::{Binding, BindingKind};
use alembic_core::ScopeIndex;

fn named<'a>(scopes: &'a ScopeIndex, name: &str) -> Vec<&'a Binding> {
    scopes
        .bindings()
        .filter(|(_, binding)| binding.name == name)
        .map(|(_, binding)| binding)
        .collect()
}

#[test]
fn test_bindings_track_reads_and_writes_separately() {
    let ast = parse(
        "
        var total = 0;
        function bump(by) {
            total = total + by;
        }
        bump(2);
        bump(3);
    ",
    )
    .unwrap();
    let scopes = ScopeIndex::build(&ast);

    let [total] = named(&scopes, "total")[..] else {
        panic!("expected one total binding");
    };
    assert_eq!(total.references.len(), 1);
    assert_eq!(total.violations.len(), 1);
    assert!(scopes.is_program_scope(total.scope));

    let [bump] = named(&scopes, "bump")[..] else {
        panic!("expected one bump binding");
    };
    assert!(matches!(bump.kind, BindingKind::Function));
    assert_eq!(bump.references.len(), 2);
    assert!(bump.violations.is_empty());

    let [by] = named(&scopes, "by")[..] else {
        panic!("expected one by binding");
    };
    assert!(matches!(by.kind, BindingKind::Param));
    assert_eq!(by.references.len(), 1);
}

#[test]
fn test_shadowing_splits_reads_between_declarations() {
    let ast = parse(
        "
        var name = 'outer';
        function wrap() {
            var name = 'inner';
            use(name);
        }
        use(name);
        wrap();
    ",
    )
    .unwrap();
    let scopes = ScopeIndex::build(&ast);

    let bindings = named(&scopes, "name");
    assert_eq!(bindings.len(), 2);
    for binding in bindings {
        assert_eq!(binding.references.len(), 1, "one read per declaration");
    }
}

#[test]
fn test_catch_parameters_bind_only_their_clause() {
    let ast = parse("try { f(); } catch (oops) { report(oops); } use(oops);").unwrap();
    let scopes = ScopeIndex::build(&ast);

    let [oops] = named(&scopes, "oops")[..] else {
        panic!("expected one oops binding");
    };
    assert!(matches!(oops.kind, BindingKind::CatchParam));
    // The use after the clause refers to a global, not the catch binding.
    assert_eq!(oops.references.len(), 1);
}

#[test]
fn test_self_writes_inside_a_function_count_as_violations() {
    let ast = parse(
        "
        function memo() {
            memo = function () {
                return 1;
            };
            return memo();
        }
        memo();
    ",
    )
    .unwrap();
    let scopes = ScopeIndex::build(&ast);

    let [memo] = named(&scopes, "memo")[..] else {
        panic!("expected one memo binding");
    };
    assert_eq!(memo.violations.len(), 1);
    // The overwrite call inside the body and the top-level call both read it.
    assert_eq!(memo.references.len(), 2);
}
