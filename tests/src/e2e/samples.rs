use super::{clean, reprint, FLATTENED_POOL_SAMPLE};

#[test]
fn test_the_flattened_pool_sample_reads_straight_through() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    assert_eq!(
        clean(FLATTENED_POOL_SAMPLE),
        reprint(
            "
            function run() {
                first('alpha');
                second('beta', 5);
                third('gamma');
            }
            run();
            "
        )
    );
}

#[test]
fn test_a_rotated_pool_inside_a_wrapper_cleans_completely() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        (function () {
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
            var mark = decode(1);
            report(mark, mark);
        })();
    ";
    // The rotation settles after one shift, the constant alias propagates,
    // and every piece of scaffolding goes with its pass.
    assert_eq!(
        clean(source),
        reprint("(function () { report('alpha', 'alpha'); })();")
    );
}

#[test]
fn test_obfuscated_branch_soup_reduces_to_its_live_path() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .try_init();
    let source = "
        function act(input) {
            var flag = 'yes';
            if (flag) {
                input > 2 && hit(input);
                input > 2 || miss(input);
            } else {
                never();
            }
            return [] ? input : 0;
        }
        act(5);
    ";
    // The guard folds away, the logical statements become ifs, and the
    // always-truthy array conditional picks its consequent.
    assert_eq!(
        clean(source),
        reprint(
            "
            function act(input) {
                if (input > 2) {
                    hit(input);
                }
                if (!(input > 2)) {
                    miss(input);
                }
                return input;
            }
            act(5);
            "
        )
    );
}
