use alembic_core::parser::parse;
use alembic_core::printer::print;
use alembic_transform::{deobfuscate, Config};

fn clean(source: &str) -> String {
    deobfuscate(source, &Config::default()).unwrap()
}

fn reprint(source: &str) -> String {
    print(&parse(source).unwrap())
}

#[test]
fn test_proxy_function_layers_collapse_to_values() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function outer() {
            function plus(a, b) {
                return a + b;
            }
            function twice(a) {
                return plus(a, a);
            }
            emit(twice(3), plus(2, 2));
        }
        outer();
    ";
    // twice unwraps to plus, plus unwraps to +, and the folded operands
    // leave both proxies unreferenced for the unused sweep.
    assert_eq!(clean(source), reprint("function outer() { emit(6, 4); } outer();"));
}

#[test]
fn test_alias_chains_unwind_before_inlining() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function act() {
            function add(a, b) {
                return a + b;
            }
            var quick = add;
            emit(quick(1, 2));
        }
        act();
    ";
    assert_eq!(clean(source), reprint("function act() { emit(3); } act();"));
}

#[test]
fn test_a_packed_proxy_object_resolves_its_reads() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function act() {
            var box = {};
            box['sum'] = function (a, b) {
                return a + b;
            };
            box['word'] = 'secret';
            send(box['sum'](1, 2), box['word']);
        }
        act();
    ";
    assert_eq!(
        clean(source),
        reprint("function act() { send(3, 'secret'); } act();")
    );
}

#[test]
fn test_an_escaping_proxy_is_kept_alive() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    // Passing the function itself around forces the declaration to stay
    // even after the direct call is expanded.
    let source = "
        function act() {
            function add(a, b) {
                return a + b;
            }
            register(add);
            emit(add(1, 2));
        }
        act();
    ";
    assert_eq!(
        clean(source),
        reprint(
            "function act() { function add(a, b) { return a + b; } register(add); emit(3); } act();"
        )
    );
}
