//! Concentration and compliance analysis.
//!
//! Market value is grouped by sector, asset class, issuer and symbol, and
//! each group's share of the total is compared against its limit. Holdings
//! with unresolved tags land in the [`UNKNOWN_BUCKET`](folio_core::UNKNOWN_BUCKET) so sector shares
//! still sum to 100%.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ConcentrationLimits;
use folio_core::{Holding, Portfolio, SecurityTags, Symbol};

/// Classification tags resolved per symbol.
pub type TagMap = HashMap<Symbol, SecurityTags>;

/// Tags for a holding: those preset on the holding, completed from `resolved`.
pub fn effective_tags(holding: &Holding, resolved: &TagMap) -> SecurityTags {
    match resolved.get(&holding.symbol) {
        Some(tags) => holding.tags.clone().merged_with(tags),
        None => holding.tags.clone(),
    }
}

/// Dimension a concentration limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationKind {
    /// Industry sector.
    Sector,
    /// Asset class.
    AssetClass,
    /// Issuer.
    Issuer,
    /// Single security across accounts.
    SinglePosition,
}

impl fmt::Display for ConcentrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sector => "Sector",
            Self::AssetClass => "Asset class",
            Self::Issuer => "Issuer",
            Self::SinglePosition => "Position",
        };
        f.write_str(s)
    }
}

/// How far a limit is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Above the limit.
    Breach,
    /// Above 1.5 × the limit.
    Critical,
}

impl Severity {
    /// Multiple of the limit above which a breach is critical.
    pub const CRITICAL_MULTIPLE: f64 = 1.5;

    fn classify(concentration_pct: f64, limit_pct: f64) -> Option<Self> {
        if concentration_pct > limit_pct * Self::CRITICAL_MULTIPLE {
            Some(Self::Critical)
        } else if concentration_pct > limit_pct {
            Some(Self::Breach)
        } else {
            None
        }
    }
}

/// A bucket whose share of the portfolio exceeds its limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    /// Limit dimension.
    pub kind: ConcentrationKind,
    /// Bucket name (sector, asset class, issuer or symbol).
    pub bucket: String,
    /// Share of total value, in percent.
    pub concentration_pct: f64,
    /// Limit, in percent.
    pub limit_pct: f64,
    /// Severity.
    pub severity: Severity,
}

impl fmt::Display for ComplianceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} concentration in {} is {:.2}%, limit {:.2}%",
            self.kind, self.bucket, self.concentration_pct, self.limit_pct
        )?;
        if self.severity == Severity::Critical {
            write!(f, " (critical)")?;
        }
        Ok(())
    }
}

/// Concentration breakdown of one portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationReport {
    /// Total market value.
    pub total_value: Decimal,
    /// Sector → percent of total.
    pub by_sector: BTreeMap<String, f64>,
    /// Asset class → percent of total.
    pub by_asset_class: BTreeMap<String, f64>,
    /// Issuer → percent of total.
    pub by_issuer: BTreeMap<String, f64>,
    /// Symbol → percent of total.
    pub by_position: BTreeMap<Symbol, f64>,
    /// Largest single position.
    pub largest_position: Option<Symbol>,
    /// Its share of total value.
    pub largest_position_pct: Option<f64>,
    /// Limit breaches, by descending concentration then bucket name.
    pub violations: Vec<ComplianceViolation>,
    /// Total value was zero or negative; no percentages were computed.
    pub degenerate: bool,
}

impl ConcentrationReport {
    fn empty(total_value: Decimal, degenerate: bool) -> Self {
        Self {
            total_value,
            by_sector: BTreeMap::new(),
            by_asset_class: BTreeMap::new(),
            by_issuer: BTreeMap::new(),
            by_position: BTreeMap::new(),
            largest_position: None,
            largest_position_pct: None,
            violations: Vec::new(),
            degenerate,
        }
    }

    /// True if no limit is breached.
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of breaches.
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Human-readable breach descriptions.
    pub fn violation_messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

fn percentages<K: Ord>(values: BTreeMap<K, Decimal>, total: Decimal) -> BTreeMap<K, f64> {
    values
        .into_iter()
        .map(|(k, v)| {
            let pct = (v / total * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0);
            (k, pct)
        })
        .collect()
}

fn breaches<K: fmt::Display>(
    kind: ConcentrationKind,
    buckets: &BTreeMap<K, f64>,
    limit_pct: f64,
) -> Vec<ComplianceViolation> {
    buckets
        .iter()
        .filter_map(|(bucket, pct)| {
            Severity::classify(*pct, limit_pct).map(|severity| ComplianceViolation {
                kind,
                bucket: bucket.to_string(),
                concentration_pct: *pct,
                limit_pct,
                severity,
            })
        })
        .collect()
}

/// Groups holdings by classification and checks every limit.
///
/// An empty portfolio yields empty maps. A portfolio whose total value is
/// zero or negative is marked degenerate instead of dividing by it.
pub fn analyze_concentration(
    portfolio: &Portfolio,
    tags: &TagMap,
    limits: &ConcentrationLimits,
) -> ConcentrationReport {
    let total = portfolio.total_value();
    if portfolio.is_empty() {
        return ConcentrationReport::empty(total, false);
    }
    if total <= Decimal::ZERO {
        return ConcentrationReport::empty(total, true);
    }

    let mut sectors: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut classes: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut issuers: BTreeMap<String, Decimal> = BTreeMap::new();

    for h in portfolio.holdings() {
        let t = effective_tags(h, tags);
        let mv = h.market_value();
        *sectors.entry(t.sector_bucket().to_string()).or_default() += mv;
        *classes.entry(t.asset_class_bucket().to_string()).or_default() += mv;
        *issuers.entry(t.issuer_bucket().to_string()).or_default() += mv;
    }

    let by_sector = percentages(sectors, total);
    let by_asset_class = percentages(classes, total);
    let by_issuer = percentages(issuers, total);
    let by_position = percentages(portfolio.exposures(), total);

    let (largest_position, largest_position_pct) = by_position
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(s, p)| (Some(s.clone()), Some(*p)))
        .unwrap_or((None, None));

    let mut violations = breaches(ConcentrationKind::Sector, &by_sector, limits.sector);
    violations.extend(breaches(
        ConcentrationKind::AssetClass,
        &by_asset_class,
        limits.asset_class,
    ));
    violations.extend(breaches(ConcentrationKind::Issuer, &by_issuer, limits.issuer));
    violations.extend(breaches(
        ConcentrationKind::SinglePosition,
        &by_position,
        limits.single_position,
    ));
    sort_violations(&mut violations);

    ConcentrationReport {
        total_value: total,
        largest_position,
        largest_position_pct,
        by_sector,
        by_asset_class,
        by_issuer,
        by_position,
        violations,
        degenerate: false,
    }
}

/// Descending concentration, then bucket name, then kind.
pub fn sort_violations(violations: &mut [ComplianceViolation]) {
    violations.sort_by(|a, b| {
        b.concentration_pct
            .total_cmp(&a.concentration_pct)
            .then_with(|| a.bucket.cmp(&b.bucket))
            .then_with(|| a.kind.cmp(&b.kind))
    });
}

/// Symbols whose sector, asset class or issuer is still unresolved.
pub fn unresolved_symbols(portfolio: &Portfolio, tags: &TagMap) -> Vec<Symbol> {
    let mut out: Vec<Symbol> = portfolio
        .holdings()
        .iter()
        .filter(|h| !effective_tags(h, tags).is_complete())
        .map(|h| h.symbol.clone())
        .collect();
    out.sort();
    out.dedup();
    out
}
