#![no_main]

use libfuzzer_sys::fuzz_target;
use strata_path::ScenePath;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(path) = ScenePath::parse(text) else {
        return;
    };

    // Anything that parses must round-trip and obey the basic algebra.
    let reparsed = ScenePath::parse(path.as_str()).expect("round trip");
    assert_eq!(reparsed, path);
    assert!(path.has_prefix(&ScenePath::absolute_root()));
    if let Some(parent) = path.parent() {
        assert!(path.has_prefix(&parent));
        assert_eq!(parent.append_child(path.name()).expect("valid name"), path);
    }
});
