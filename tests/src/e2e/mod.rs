//! End to end deobfuscation tests.
//!
//! Each case drives a complete obfuscated program through the default
//! pipeline and compares the printed output against its readable form.

use alembic_core::parser::parse;
use alembic_core::printer::print;
use alembic_transform::{deobfuscate, Config};

/// Runs the default pipeline over a source string.
pub fn clean(source: &str) -> String {
    deobfuscate(source, &Config::default()).unwrap()
}

/// Parses and reprints a source string without transforming it.
pub fn reprint(source: &str) -> String {
    print(&parse(source).unwrap())
}

/// A flattened block calling into a memoized string pool, with a proxy
/// function and a decoy branch mixed in. The readable form is three calls.
pub const FLATTENED_POOL_SAMPLE: &str = "
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
    function run() {
        function add(a, b) {
            return a + b;
        }
        var order = '1|0|2'.split('|');
        var step = 0;
        while (true) {
            switch (order[step++]) {
                case '0':
                    if ('') {
                        decoy();
                    } else {
                        second(decode(2), add(4, 1));
                    }
                    continue;
                case '1':
                    first(decode(1));
                    continue;
                case '2':
                    third(decode(3));
                    continue;
            }
            break;
        }
    }
    run();
";

#[cfg(test)]
mod pipeline;

#[cfg(test)]
mod samples;
