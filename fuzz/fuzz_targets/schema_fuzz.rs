//! Schema fuzz target: feed arbitrary text to the definition parser and model builder.
//! Neither may panic; malformed input must come back as a `SchemaError`.
//! Build with: cargo fuzz run schema_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let sources = [mavgen::Source::new("fuzz.xml", s)];
    let _ = mavgen::load_model(&sources, mavgen::RenderContext::default());
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run schema_fuzz");
}
