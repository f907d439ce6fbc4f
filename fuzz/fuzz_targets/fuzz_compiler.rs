#![no_main]

use libfuzzer_sys::fuzz_target;
use moonhost_compiler::compile;

fuzz_target!(|data: &[u8]| {
    // Any input may fail to compile; none may panic.
    let _ = compile(data, "fuzz");
});
