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
fn test_flattened_dispatch_unwinds_and_sweeps_its_scaffolding() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function run() {
            var order = '1|0|2'.split('|');
            var step = 0;
            while (true) {
                switch (order[step++]) {
                    case '0':
                        second();
                        continue;
                    case '1':
                        first();
                        continue;
                    case '2':
                        third();
                        continue;
                }
                break;
            }
        }
        run();
    ";
    // The counter survives the recovery pass and falls to the unused
    // variable sweep on the next iteration.
    assert_eq!(
        clean(source),
        reprint("function run() { first(); second(); third(); } run();")
    );
}

#[test]
fn test_for_dispatch_with_decoy_branches_comes_out_straight() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function go() {
            var path = '0|2|1'.split('|');
            for (var i = 0;;) {
                switch (path[i++]) {
                    case '0':
                        open();
                        continue;
                    case '1':
                        if (0) {
                            trap();
                        } else {
                            close();
                        }
                        continue;
                    case '2':
                        send(1 + 2);
                        continue;
                }
                break;
            }
        }
        go();
    ";
    assert_eq!(
        clean(source),
        reprint("function go() { open(); send(3); close(); } go();")
    );
}

#[test]
fn test_an_ordinary_split_loop_is_left_alone() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    // A real iteration over split parts has no dispatch shape to recover.
    let source = "
        var parts = 'a|b|c'.split('|');
        for (var i = 0; i < parts.length; i++) {
            use(parts[i]);
        }
    ";
    assert_eq!(clean(source), reprint(source));
}
