//! Fuzz target for PolicyDocument::from_toml
//!
//! Arbitrary TOML must never panic the document parser, and every
//! document it accepts must load cleanly within the default limits or
//! fail with a `PolicyError`.

#![no_main]

use core_logic::{Policy, PolicyDocument, MAX_PREDICATE_NAME_LENGTH, MAX_RULES_PER_POLICY};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let Ok(document) = PolicyDocument::from_toml(data) else {
        return;
    };

    assert!(document.name().len() <= MAX_PREDICATE_NAME_LENGTH);

    // Loading may reject the rules, but must not panic
    if let Ok(registry) = document.registry() {
        let policy = Policy::new(registry);
        if let Ok(report) = policy.load(document.rules().to_vec()) {
            assert_eq!(report.rules, document.rules().len());
            assert!(report.rules <= MAX_RULES_PER_POLICY);
            assert_eq!(policy.version(), 1);
            // Queries over fuzzed rules stop at the depth ceiling
            let _ = policy.is_allowed("alice", "read", "doc");
        }
    }

    let _ = document.to_toml();
});
