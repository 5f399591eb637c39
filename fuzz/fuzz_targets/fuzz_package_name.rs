#![no_main]

use gaia_core::{Ecosystem, PackageKey};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };

    for ecosystem in Ecosystem::ALL {
        let normalized = ecosystem.normalize_name(name);

        // Normalisation is idempotent
        assert_eq!(ecosystem.normalize_name(&normalized), normalized);

        // Keys built from raw and normalised names agree
        assert_eq!(
            PackageKey::new(ecosystem, name),
            PackageKey::new(ecosystem, &normalized)
        );
    }
});
