//! Stress scenario definitions.
//!
//! Shock tables are configuration data. A shock is a fractional price move:
//! `-0.30` is a 30% fall and `-1.0` a total loss.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::{Validate, ValidationError};
use crate::status::DataWarning;
use folio_core::{ScenarioId, SecurityTags, Symbol};

/// A named set of price shocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Scenario identifier.
    pub id: ScenarioId,

    /// Display name.
    pub name: String,

    /// Historical event label, e.g. "2008".
    #[serde(default)]
    pub event: Option<String>,

    /// Shocks for specific symbols.
    #[serde(default)]
    pub symbol_shocks: BTreeMap<Symbol, f64>,

    /// Shocks by asset class.
    #[serde(default)]
    pub asset_class_shocks: BTreeMap<String, f64>,

    /// Shocks by sector.
    #[serde(default)]
    pub sector_shocks: BTreeMap<String, f64>,

    /// Shock for holdings no table matches.
    #[serde(default)]
    pub default_shock: Option<f64>,

    /// Trading days the market took to regain its pre-shock level.
    #[serde(default)]
    pub recovery_days: Option<u32>,
}

impl ScenarioDefinition {
    /// Creates a scenario with no shocks.
    pub fn new(id: impl Into<ScenarioId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            event: None,
            symbol_shocks: BTreeMap::new(),
            asset_class_shocks: BTreeMap::new(),
            sector_shocks: BTreeMap::new(),
            default_shock: None,
            recovery_days: None,
        }
    }

    /// Sets the historical event label.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Adds a symbol shock.
    #[must_use]
    pub fn with_symbol_shock(mut self, symbol: impl Into<Symbol>, shock: f64) -> Self {
        self.symbol_shocks.insert(symbol.into(), shock);
        self
    }

    /// Adds an asset class shock.
    #[must_use]
    pub fn with_asset_class_shock(mut self, asset_class: impl Into<String>, shock: f64) -> Self {
        self.asset_class_shocks.insert(asset_class.into(), shock);
        self
    }

    /// Adds a sector shock.
    #[must_use]
    pub fn with_sector_shock(mut self, sector: impl Into<String>, shock: f64) -> Self {
        self.sector_shocks.insert(sector.into(), shock);
        self
    }

    /// Sets the fallback shock.
    #[must_use]
    pub fn with_default_shock(mut self, shock: f64) -> Self {
        self.default_shock = Some(shock);
        self
    }

    /// Sets the recovery estimate.
    #[must_use]
    pub fn with_recovery_days(mut self, days: u32) -> Self {
        self.recovery_days = Some(days);
        self
    }

    /// Shock for a holding: symbol, then asset class, then sector, then the
    /// default, then zero.
    pub fn shock_for(&self, symbol: &Symbol, tags: &SecurityTags) -> f64 {
        if let Some(s) = self.symbol_shocks.get(symbol) {
            return *s;
        }
        if let Some(s) = tags
            .asset_class
            .as_ref()
            .and_then(|c| self.asset_class_shocks.get(c.trim()))
        {
            return *s;
        }
        if let Some(s) = tags
            .sector
            .as_ref()
            .and_then(|c| self.sector_shocks.get(c.trim()))
        {
            return *s;
        }
        self.default_shock.unwrap_or(0.0)
    }

    fn all_shocks(&self) -> impl Iterator<Item = f64> + '_ {
        self.symbol_shocks
            .values()
            .chain(self.asset_class_shocks.values())
            .chain(self.sector_shocks.values())
            .chain(self.default_shock.iter())
            .copied()
    }
}

impl Validate for ScenarioDefinition {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let field = |name: &str| format!("scenarios.{}.{name}", self.id);

        if self.id.as_str().trim().is_empty() {
            errors.push(ValidationError::new("scenarios.id", "Scenario id cannot be empty"));
        }
        if self.name.trim().is_empty() {
            errors.push(ValidationError::new(field("name"), "Name cannot be empty"));
        }
        if self.all_shocks().any(|s| !(s.is_finite() && s >= -1.0)) {
            errors.push(ValidationError::with_rule(
                field("shocks"),
                "Shocks must be finite and no lower than -1.0",
                "valid_shock",
            ));
        }
        errors
    }
}

/// The scenarios available to stress runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioLibrary {
    scenarios: Vec<ScenarioDefinition>,
}

impl ScenarioLibrary {
    /// Creates a library from definitions.
    pub fn new(scenarios: Vec<ScenarioDefinition>) -> Self {
        Self { scenarios }
    }

    /// All scenarios, in definition order.
    pub fn scenarios(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    /// Number of scenarios.
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// True if no scenarios are defined.
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Looks up a scenario.
    pub fn get(&self, id: &ScenarioId) -> Option<&ScenarioDefinition> {
        self.scenarios.iter().find(|s| &s.id == id)
    }

    /// All scenario identifiers.
    pub fn ids(&self) -> Vec<ScenarioId> {
        self.scenarios.iter().map(|s| s.id.clone()).collect()
    }

    /// Resolves requested ids in request order.
    ///
    /// An empty request selects every scenario. Unknown ids become warnings.
    pub fn select(&self, ids: &[ScenarioId]) -> (Vec<&ScenarioDefinition>, Vec<DataWarning>) {
        if ids.is_empty() {
            return (self.scenarios.iter().collect(), Vec::new());
        }

        let mut found = Vec::with_capacity(ids.len());
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            match self.get(id) {
                Some(s) => found.push(s),
                None => warnings.push(DataWarning::UnknownScenario {
                    scenario: id.clone(),
                }),
            }
        }
        (found, warnings)
    }
}

impl Validate for ScenarioLibrary {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> =
            self.scenarios.iter().flat_map(|s| s.validate()).collect();

        let mut seen = HashSet::new();
        for s in &self.scenarios {
            if !seen.insert(&s.id) {
                errors.push(ValidationError::with_rule(
                    "scenarios",
                    format!("Duplicate scenario id '{}'", s.id),
                    "unique_ids",
                ));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gfc() -> ScenarioDefinition {
        ScenarioDefinition::new("gfc-2008", "Global Financial Crisis")
            .with_event("2008")
            .with_symbol_shock("JPM", -0.60)
            .with_asset_class_shock("Equity", -0.50)
            .with_sector_shock("Financials", -0.55)
            .with_default_shock(-0.20)
            .with_recovery_days(1_400)
    }

    #[test]
    fn test_shock_precedence() {
        let s = gfc();
        let fin_equity = SecurityTags::new()
            .with_sector("Financials")
            .with_asset_class("Equity");

        assert_eq!(s.shock_for(&Symbol::new("JPM"), &fin_equity), -0.60);
        assert_eq!(s.shock_for(&Symbol::new("BAC"), &fin_equity), -0.50);
        assert_eq!(
            s.shock_for(&Symbol::new("BAC"), &SecurityTags::new().with_sector("Financials")),
            -0.55
        );
        assert_eq!(s.shock_for(&Symbol::new("GLD"), &SecurityTags::new()), -0.20);

        let no_default = ScenarioDefinition::new("x", "x");
        assert_eq!(no_default.shock_for(&Symbol::new("GLD"), &SecurityTags::new()), 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_shock() {
        let s = gfc().with_sector_shock("Energy", -1.5);
        assert!(!s.is_valid());
        assert!(gfc().with_default_shock(-1.0).is_valid());
    }

    #[test]
    fn test_library_select() {
        let lib = ScenarioLibrary::new(vec![
            gfc(),
            ScenarioDefinition::new("covid-2020", "COVID-19 crash").with_event("2020"),
        ]);

        let (all, warnings) = lib.select(&[]);
        assert_eq!(all.len(), 2);
        assert!(warnings.is_empty());

        let (some, warnings) = lib.select(&[
            ScenarioId::new("covid-2020"),
            ScenarioId::new("nope"),
            ScenarioId::new("covid-2020"),
        ]);
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].id.as_str(), "covid-2020");
        assert_eq!(
            warnings,
            vec![DataWarning::UnknownScenario {
                scenario: ScenarioId::new("nope")
            }]
        );
    }

    #[test]
    fn test_library_duplicate_ids() {
        let lib = ScenarioLibrary::new(vec![gfc(), gfc()]);
        let errors = lib.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_deref(), Some("unique_ids"));
    }
}
