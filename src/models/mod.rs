//! Curated example models
//!
//! Small, complete descriptors covering the core constructs: units,
//! kinetics, rules, events, function definitions and flux balance
//! constraints. Every model builds and passes all validation stages with
//! units checks enabled.

use crate::descriptor::ModelDescriptor;

mod fbc;
mod kinetic;

pub use fbc::fbc_example;
pub use kinetic::{mass_action, michaelis_menten};

/// All curated descriptors, in a fixed order.
pub fn curated() -> Vec<ModelDescriptor> {
    vec![mass_action(), michaelis_menten(), fbc_example()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_document, BuildOptionsBuilder};

    #[test]
    fn test_curated_models_are_consistent() {
        let options = BuildOptionsBuilder::default()
            .units_check(true)
            .build()
            .unwrap();
        for descriptor in curated() {
            let result = build_document(&descriptor, &options)
                .unwrap_or_else(|failure| panic!("{}: {failure}", descriptor.mid));
            let report = result.validation.unwrap();
            assert!(report.is_valid, "{}:\n{report}", descriptor.mid);
            assert_eq!(report.errors().count(), 0, "{}", descriptor.mid);
        }
    }

    #[test]
    fn test_curated_ids_are_unique() {
        let mut ids: Vec<String> = curated().into_iter().map(|d| d.mid).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), curated().len());
    }
}
