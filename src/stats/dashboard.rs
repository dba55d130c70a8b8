//! Dashboard Views Module
//! Computes every chart table of the meteorite landings page in one pass.

use super::calculator::{ViewCalculator, ViewError};
use crate::config::ViewSettings;
use crate::data::{DataProcessor, LandingSchema};
use crate::spatial::{CONTINENT_COLUMN, COUNTRY_COLUMN};
use polars::prelude::*;
use tracing::debug;

/// Chart-ready tables derived from the landings and the enriched landings.
#[derive(Debug, Clone)]
pub struct DashboardViews {
    pub continent_shares: DataFrame,
    /// Percentage of enriched landings on the highlighted continent.
    pub highlighted_share: f64,
    pub top_countries: DataFrame,
    pub top_classes: DataFrame,
    pub class_mass: DataFrame,
    pub yearly_counts: DataFrame,
    pub continent_running_totals: DataFrame,
    pub yearly_mass: DataFrame,
}

impl DashboardViews {
    /// Build the continent shares, top countries and classes, class and yearly mass
    /// means, yearly counts and per-continent running totals.
    ///
    /// Fails with [`ViewError::EmptyInput`] if any single view has nothing to aggregate.
    pub fn compute(
        landings: &DataFrame,
        enriched: &DataFrame,
        schema: &LandingSchema,
        settings: &ViewSettings,
    ) -> Result<Self, ViewError> {
        let continent_shares = ViewCalculator::percentage_of_total(enriched, CONTINENT_COLUMN)?;
        let highlighted_share = ViewCalculator::share_of(
            enriched,
            CONTINENT_COLUMN,
            &settings.highlighted_continent,
        )?;

        let countries = match &settings.excluded_country {
            Some(country) => DataProcessor::exclude_value(enriched, COUNTRY_COLUMN, country)?,
            None => enriched.clone(),
        };
        let top_countries = ViewCalculator::top_n(&countries, COUNTRY_COLUMN, settings.top_countries)?;

        let top_classes = ViewCalculator::top_n(landings, &schema.class, settings.top_classes)?;
        let class_mass = ViewCalculator::group_mean(
            landings,
            &schema.class,
            &schema.mass,
            Some(settings.heaviest_classes),
        )?;

        let (from, to) = settings.landing_years;
        let recent = DataProcessor::filter_range(landings, &schema.year, from as f64, to as f64)?;
        let yearly_counts = ViewCalculator::count_per_bucket(&recent, &schema.year)?;

        let recent_enriched =
            DataProcessor::filter_range(enriched, &schema.year, from as f64, to as f64)?;
        let continent_running_totals =
            ViewCalculator::running_total(&recent_enriched, &schema.year, CONTINENT_COLUMN)?;

        let (from, to) = settings.mass_years;
        let mass_window = DataProcessor::filter_range(landings, &schema.year, from as f64, to as f64)?;
        let yearly_mass = ViewCalculator::group_mean(&mass_window, &schema.year, &schema.mass, None)?;

        debug!(
            continents = continent_shares.height(),
            classes = top_classes.height(),
            years = yearly_counts.height(),
            "computed dashboard views"
        );

        Ok(Self {
            continent_shares,
            highlighted_share,
            top_countries,
            top_classes,
            class_mass,
            yearly_counts,
            continent_running_totals,
            yearly_mass,
        })
    }

    /// Every table with a stable file-friendly name.
    pub fn tables(&self) -> [(&'static str, &DataFrame); 7] {
        [
            ("continent_shares", &self.continent_shares),
            ("top_countries", &self.top_countries),
            ("top_classes", &self.top_classes),
            ("class_mass", &self.class_mass),
            ("yearly_counts", &self.yearly_counts),
            ("continent_running_totals", &self.continent_running_totals),
            ("yearly_mass", &self.yearly_mass),
        ]
    }
}
