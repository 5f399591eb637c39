#![no_main]

use gaia_core::VersionConstraint;
use libfuzzer_sys::fuzz_target;

const CANDIDATES: [&str; 10] = [
    "0.0.0",
    "0.0.1",
    "0.2.3",
    "1.0.0",
    "1.2.3",
    "1.9.5-beta.1",
    "2.0.0",
    "2.5.RELEASE",
    "10.20.30",
    "not-a-version",
];

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(constraint) = VersionConstraint::parse(s) else {
        return;
    };

    for candidate in CANDIDATES {
        let _ = constraint.matches(candidate);
    }

    // The selected candidate must itself match, unless it is the Latest
    // pre-release fallback
    if let Some(best) = constraint.select_best(CANDIDATES) {
        assert!(constraint.matches(best) || constraint.is_latest());
    }

    // Re-parsing the stored expression gives the same range
    let reparsed = VersionConstraint::parse(constraint.as_str()).unwrap();
    assert_eq!(reparsed.ranges(), constraint.ranges());
});
