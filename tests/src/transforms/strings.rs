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
fn test_a_memoized_pool_disappears_into_its_strings() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function pool() {
            var data = ['alpha', 'beta', 'gamma'];
            pool = function () {
                return data;
            };
            return pool();
        }
        function decode(index, extra) {
            var values = pool();
            decode = function (i, u) {
                i = i - 1;
                var value = values[i];
                return value;
            };
            return decode(index, extra);
        }
        log(decode(1), decode(3));
    ";
    assert_eq!(clean(source), reprint("log('alpha', 'gamma');"));
}

#[test]
fn test_a_base64_wrapper_decodes_end_to_end() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        var data = ['Agv5', 'y2fI'];
        function decode(index, extra) {
            index = index - 0;
            var encoded = data[index];
            if (decode.ready === undefined) {
                decode.convert = function (input) {
                    var folded = 'abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/='.indexOf(input);
                    return folded;
                };
                decode.ready = true;
            }
            var plain = decode.convert(encoded);
            if (plain === undefined) {
                plain = '';
            }
            return plain;
        }
        log(decode(0), decode(1));
    ";
    assert_eq!(clean(source), reprint("log('hey', 'cab');"));
}

#[test]
fn test_an_rc4_wrapper_decodes_end_to_end() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function pool() {
            var data = ['WRVdSXBdQmozqmkVcSot'];
            pool = function () {
                return data;
            };
            return pool();
        }
        function decode(index, key) {
            var values = pool();
            decode = function (i, k) {
                i = i - 0;
                var encoded = values[i];
                if (decode.shim === undefined) {
                    decode.mix = function (input, pad) {
                        var s = [];
                        var seed = 'abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/='.indexOf(input);
                        var output = '';
                        for (var y = 0; y < input.length; y++) {
                            output += String.fromCharCode(input.charCodeAt(y) ^ pad[(s[y] + s[seed]) % 256]);
                        }
                        return output;
                    };
                    decode.shim = true;
                }
                var plain = decode.mix(encoded, k);
                if (plain === undefined) {
                    plain = '';
                }
                return plain;
            };
            return decode(index, key);
        }
        log(decode(0, 'Key'));
    ";
    assert_eq!(clean(source), reprint("log('Plaintext');"));
}

#[test]
fn test_a_rotated_pool_settles_and_then_reveals() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function pool() {
            var data = ['5', 'x', 'alpha'];
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
                    var probe = parseInt(decode(2)) + 1;
                    if (probe === target) {
                        break;
                    } else {
                        arr.push(arr.shift());
                    }
                } catch (e) {
                    arr.push(arr.shift());
                }
            }
        })(pool, 6);
        log(decode(1));
    ";
    assert_eq!(clean(source), reprint("log('alpha');"));
}
