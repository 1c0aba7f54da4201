//! A farm's policy selection across all six domains.

use std::collections::BTreeMap;

use farmstead_types::Domain;
use serde::{Deserialize, Serialize};

use crate::{
    CropPolicy, EconomicPolicy, EnergyPolicy, MarketPolicy, Policy, PolicyError, ProcessingPolicy,
    WaterPolicy,
};

/// One policy per domain. Domains omitted from the scenario file use each
/// enum's default rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySet {
    /// Irrigation rule.
    #[serde(default)]
    pub crop: CropPolicy,
    /// Processing rule.
    #[serde(default)]
    pub processing: ProcessingPolicy,
    /// Water-sourcing rule.
    #[serde(default)]
    pub water: WaterPolicy,
    /// Energy-dispatch rule.
    #[serde(default)]
    pub energy: EnergyPolicy,
    /// Market rule.
    #[serde(default)]
    pub market: MarketPolicy,
    /// Income-allocation rule.
    #[serde(default)]
    pub economic: EconomicPolicy,
}

impl PolicySet {
    /// Check every selected rule's parameters.
    ///
    /// # Errors
    ///
    /// Returns the first [`PolicyError`] encountered, in evaluation order.
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.crop.validate()?;
        self.processing.validate()?;
        self.water.validate()?;
        self.energy.validate()?;
        self.market.validate()?;
        self.economic.validate()
    }

    /// The selected rule's name for `domain`.
    pub fn name_for(&self, domain: Domain) -> &'static str {
        match domain {
            Domain::Crop => self.crop.name(),
            Domain::Processing => self.processing.name(),
            Domain::Water => self.water.name(),
            Domain::Energy => self.energy.name(),
            Domain::Market => self.market.name(),
            Domain::Economic => self.economic.name(),
        }
    }

    /// Selected rule names keyed by domain, for the decision log header.
    pub fn names(&self) -> BTreeMap<Domain, String> {
        Domain::EVALUATION_ORDER
            .iter()
            .map(|&domain| (domain, self.name_for(domain).to_owned()))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn omitted_domains_use_defaults() {
        let yaml = "water:\n  name: quota_enforced\n  groundwater_quota_m3: 400.0\n";
        let set: PolicySet = serde_yml::from_str(yaml).unwrap();
        assert_eq!(
            set.water,
            WaterPolicy::QuotaEnforced {
                groundwater_quota_m3: 400.0
            }
        );
        assert_eq!(set.energy, EnergyPolicy::RenewableFirst);
        assert_eq!(set.crop, CropPolicy::FullIrrigation);
    }

    #[test]
    fn unknown_domain_is_rejected() {
        let result: Result<PolicySet, _> = serde_yml::from_str("weather:\n  name: sunny\n");
        assert!(result.is_err());
    }

    #[test]
    fn names_cover_every_domain() {
        let names = PolicySet::default().names();
        assert_eq!(names.len(), 6);
        assert_eq!(names.get(&Domain::Water).map(String::as_str), Some("cheapest_source"));
        assert_eq!(names.get(&Domain::Economic).map(String::as_str), Some("conservative"));
    }

    #[test]
    fn validate_surfaces_bad_parameters() {
        let set = PolicySet {
            economic: EconomicPolicy::Balanced { debt_share: 2.0 },
            ..PolicySet::default()
        };
        assert!(set.validate().is_err());
        assert!(PolicySet::default().validate().is_ok());
    }
}
