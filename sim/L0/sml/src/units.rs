//! Unit handling.
//!
//! Every literal in an SML document is written in the document's local
//! units, chosen per category by `<units length="mm" mass="g"/>`. The
//! [`UnitContext`] built from that declaration converts those literals into
//! internal SI units. Unit symbols are looked up in a [`UnitRegistry`] keyed
//! `<category>_<symbol>` (e.g. `length_mm`).

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BuildError;

/// Base unit category that a document may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnitCategory {
    /// Length (SI: metre).
    Length,
    /// Mass (SI: kilogram).
    Mass,
    /// Time (SI: second).
    Time,
}

impl UnitCategory {
    /// All categories.
    pub const ALL: [Self; 3] = [Self::Length, Self::Mass, Self::Time];

    /// Parse a category name as written in `<units>`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "length" => Some(Self::Length),
            "mass" => Some(Self::Mass),
            "time" => Some(Self::Time),
            _ => None,
        }
    }

    /// Category name as written in `<units>`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Mass => "mass",
            Self::Time => "time",
        }
    }

    /// Symbol of the SI unit for this category.
    pub fn si_symbol(self) -> &'static str {
        match self {
            Self::Length => "m",
            Self::Mass => "kg",
            Self::Time => "s",
        }
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical quantity of a parsed literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Length.
    Length,
    /// Mass.
    Mass,
    /// Time.
    Time,
    /// Length².
    Area,
    /// Length³.
    Volume,
    /// Mass / length³.
    Density,
    /// Mass · length².
    Inertia,
}

/// Registry of known units: `<category>_<symbol>` → factor to SI.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitRegistry {
    units: HashMap<String, f64>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl UnitRegistry {
    /// Registry with no units at all.
    pub fn empty() -> Self {
        Self {
            units: HashMap::new(),
        }
    }

    /// The standard metric units.
    pub fn standard() -> Self {
        Self::empty()
            .with_unit(UnitCategory::Length, "m", 1.0)
            .with_unit(UnitCategory::Length, "dm", 1e-1)
            .with_unit(UnitCategory::Length, "cm", 1e-2)
            .with_unit(UnitCategory::Length, "mm", 1e-3)
            .with_unit(UnitCategory::Mass, "kg", 1.0)
            .with_unit(UnitCategory::Mass, "g", 1e-3)
            .with_unit(UnitCategory::Time, "s", 1.0)
            .with_unit(UnitCategory::Time, "ms", 1e-3)
    }

    /// Register (or replace) a unit.
    #[must_use]
    pub fn with_unit(mut self, category: UnitCategory, symbol: &str, to_si: f64) -> Self {
        self.units.insert(Self::key(category, symbol), to_si);
        self
    }

    /// Factor converting one `symbol` of `category` into SI.
    pub fn factor(&self, category: UnitCategory, symbol: &str) -> Option<f64> {
        self.units.get(&Self::key(category, symbol)).copied()
    }

    fn key(category: UnitCategory, symbol: &str) -> String {
        format!("{}_{symbol}", category.as_str())
    }
}

/// Unit chosen for one category.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitChoice {
    /// Unit symbol, e.g. `mm`.
    pub symbol: String,
    /// Factor converting one of this unit into SI.
    pub to_si: f64,
}

impl UnitChoice {
    fn si(category: UnitCategory) -> Self {
        Self {
            symbol: category.si_symbol().to_string(),
            to_si: 1.0,
        }
    }
}

/// Active units of a build.
///
/// Categories that are never overridden stay at their default (SI unless
/// the caller seeded a different context).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitContext {
    /// Length unit.
    pub length: UnitChoice,
    /// Mass unit.
    pub mass: UnitChoice,
    /// Time unit.
    pub time: UnitChoice,
}

impl Default for UnitContext {
    fn default() -> Self {
        Self::si()
    }
}

/// Outcome of applying a `<units>` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitResolution {
    /// The resulting context.
    pub context: UnitContext,
    /// Overrides that were applied, in declaration order.
    pub applied: Vec<(UnitCategory, String)>,
    /// Rejected overrides.
    pub errors: Vec<BuildError>,
}

impl UnitContext {
    /// All categories in SI.
    pub fn si() -> Self {
        Self {
            length: UnitChoice::si(UnitCategory::Length),
            mass: UnitChoice::si(UnitCategory::Mass),
            time: UnitChoice::si(UnitCategory::Time),
        }
    }

    /// Unit chosen for a category.
    pub fn choice(&self, category: UnitCategory) -> &UnitChoice {
        match category {
            UnitCategory::Length => &self.length,
            UnitCategory::Mass => &self.mass,
            UnitCategory::Time => &self.time,
        }
    }

    fn choice_mut(&mut self, category: UnitCategory) -> &mut UnitChoice {
        match category {
            UnitCategory::Length => &mut self.length,
            UnitCategory::Mass => &mut self.mass,
            UnitCategory::Time => &mut self.time,
        }
    }

    /// Override one category by symbol.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Configuration`] if the category or symbol is not
    /// known; the context is left unchanged.
    pub fn set(
        &mut self,
        category: &str,
        symbol: &str,
        registry: &UnitRegistry,
    ) -> Result<UnitCategory, BuildError> {
        let cat = UnitCategory::from_str(category).ok_or_else(|| {
            BuildError::configuration(format!("unknown unit category '{category}'"))
        })?;
        let to_si = registry.factor(cat, symbol).ok_or_else(|| {
            BuildError::configuration(format!("unknown {cat} unit '{symbol}'"))
        })?;
        *self.choice_mut(cat) = UnitChoice {
            symbol: symbol.to_string(),
            to_si,
        };
        Ok(cat)
    }

    /// Apply a `<units>` declaration on top of `self`.
    ///
    /// Each rejected pair is collected and the remaining pairs still apply.
    /// A one-line summary of the applied overrides is logged.
    pub fn resolve(
        &self,
        declaration: &[(String, String)],
        registry: &UnitRegistry,
    ) -> UnitResolution {
        let mut context = self.clone();
        let mut applied = Vec::new();
        let mut errors = Vec::new();

        for (category, symbol) in declaration {
            match context.set(category, symbol, registry) {
                Ok(cat) => applied.push((cat, symbol.clone())),
                Err(e) => errors.push(e),
            }
        }

        if !applied.is_empty() {
            let summary: Vec<String> = applied
                .iter()
                .map(|(cat, symbol)| format!("{cat}:{symbol}"))
                .collect();
            info!(
                overrides = applied.len(),
                "units set to: {}",
                summary.join(" ")
            );
        }

        UnitResolution {
            context,
            applied,
            errors,
        }
    }

    /// Factor converting one document unit of `quantity` into SI.
    pub fn factor(&self, quantity: Quantity) -> f64 {
        let l = self.length.to_si;
        let m = self.mass.to_si;
        match quantity {
            Quantity::Length => l,
            Quantity::Mass => m,
            Quantity::Time => self.time.to_si,
            Quantity::Area => l * l,
            Quantity::Volume => l * l * l,
            Quantity::Density => m / (l * l * l),
            Quantity::Inertia => m * l * l,
        }
    }

    /// Convert a document value into internal units.
    pub fn to_internal(&self, quantity: Quantity, value: f64) -> f64 {
        value * self.factor(quantity)
    }

    /// Convert an internal value back into document units.
    pub fn from_internal(&self, quantity: Quantity, value: f64) -> f64 {
        value / self.factor(quantity)
    }
}
