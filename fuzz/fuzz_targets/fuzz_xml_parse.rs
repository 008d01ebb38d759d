#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must not panic. Errors are fine, panics are bugs.
    if let Ok(tree) = fiskal::fiscal::xml::parse(data) {
        let canonical = fiskal::fiscal::canonicalize(&tree).unwrap();
        let reparsed = fiskal::fiscal::xml::parse(&canonical).unwrap();
        assert_eq!(fiskal::fiscal::canonicalize(&reparsed).unwrap(), canonical);
    }
});
