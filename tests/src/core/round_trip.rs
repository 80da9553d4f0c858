use alembic_core::parser::parse;
use alembic_core::printer::print;

fn roundtrip(source: &str) -> String {
    print(&parse(source).unwrap())
}

#[test]
fn test_printing_is_stable_after_one_pass() {
    // Fixture: one of everything the obfuscated corpus leans on.
    let source = "
        var gate = (function () {
            var seen = {};
            return function (key, value) {
                seen[key] = value === undefined ? null : value;
                return seen;
            };
        })();
        function walk(list) {
            for (var i = 0, n = list.length; i < n; i++) {
                switch (typeof list[i]) {
                    case 'string':
                        gate('s', list[i]);
                        continue;
                    case 'number':
                        break;
                    default:
                        gate('?', list[i]);
                }
                try {
                    list[i] += 1;
                } catch (e) {
                    gate('e', e);
                } finally {
                    i && gate('f', i);
                }
            }
            while (list.length > 3) {
                list.pop();
            }
            do {
                list.push(0);
            } while (list.length < 2);
            return list ? list : [];
        }
        walk(['a', 1, , new Date(), `n = 3`]);
    ";
    let once = roundtrip(source);
    assert_eq!(roundtrip(&once), once, "second print should settle");
}

#[test]
fn test_spelling_variants_converge_on_one_form() {
    assert_eq!(roundtrip("x = (((1)));"), roundtrip("x = 1;"));
    assert_eq!(roundtrip("a(\"double\");"), roundtrip("a('double');"));
    assert_eq!(
        roundtrip("if (c) { f(); }"),
        roundtrip("if (c)\n{\n    f();\n}")
    );
}

#[test]
fn test_escape_sequences_keep_their_raw_spelling() {
    assert_eq!(roundtrip("a('\\x48\\u0065y');"), "a('\\x48\\u0065y');\n");
}

#[test]
fn test_malformed_input_reports_an_error() {
    assert!(parse("function (").is_err());
    assert!(parse("var = 3;").is_err());
}
