//! Stats module - aggregate views for charts

mod calculator;
mod dashboard;

pub use calculator::{
    ViewCalculator, ViewError, COUNT_COLUMN, PERCENTAGE_COLUMN, RUNNING_TOTAL_COLUMN,
};
pub use dashboard::DashboardViews;
