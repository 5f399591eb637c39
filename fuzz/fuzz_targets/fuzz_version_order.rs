#![no_main]

use arbitrary::Arbitrary;
use gaia_core::Version;
use gaia_registry::sort_versions_descending;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    left: String,
    right: String,
    listing: Vec<String>,
}

fuzz_target!(|input: Input| {
    if let (Ok(a), Ok(b)) = (Version::parse(&input.left), Version::parse(&input.right)) {
        // Ordering is antisymmetric
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
        let _ = a.to_string();
    }

    // Sorting never panics and never grows the listing
    let sorted = sort_versions_descending(input.listing.clone());
    assert!(sorted.len() <= input.listing.len());
});
