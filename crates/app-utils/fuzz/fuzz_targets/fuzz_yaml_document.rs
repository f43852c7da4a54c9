//! Fuzz target for YamlParser::parse
//!
//! Arbitrary YAML must never panic the parser. Accepted documents keep
//! their name within MAX_PREDICATE_NAME_LENGTH = 128, and a default
//! policy only loads them within MAX_RULES_PER_POLICY = 1024 rules.

#![no_main]

use app_utils::{offline_registry, Error, PolicyParser, YamlParser};
use core_logic::{Policy, MAX_PREDICATE_NAME_LENGTH, MAX_RULES_PER_POLICY};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    match YamlParser.parse(data) {
        Ok(document) => {
            assert!(document.name().len() <= MAX_PREDICATE_NAME_LENGTH);

            if let Ok(registry) = offline_registry(&document) {
                let policy = Policy::new(registry);
                if policy.load(document.rules().to_vec()).is_ok() {
                    assert!(document.rules().len() <= MAX_RULES_PER_POLICY);
                }
            }
        }
        Err(Error::Parse { format, .. }) => assert_eq!(format, "YAML"),
        Err(other) => panic!("unexpected error kind: {}", other),
    }
});
