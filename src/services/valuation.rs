//! Book value computation
//!
//! Straight-line monthly depreciation on calendar-month boundaries. Every
//! function here is pure: the caller supplies `now`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{asset::AssetView, Asset, Settings};

/// Whole calendar months between purchase and `now`, ignoring the day of month.
/// Purchase dates in the future count as zero months.
pub fn months_elapsed(purchase_date: NaiveDate, now: NaiveDate) -> i64 {
    let months = (now.year() as i64 - purchase_date.year() as i64) * 12
        + (now.month() as i64 - purchase_date.month() as i64);
    months.max(0)
}

pub fn book_value(
    purchase_value: Decimal,
    purchase_date: NaiveDate,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Decimal {
    if !settings.is_depreciation_enabled {
        return purchase_value;
    }

    let months = months_elapsed(purchase_date, now.date_naive());
    let monthly_rate = settings.depreciation_rate / Decimal::ONE_HUNDRED;
    // A product too large for Decimal is larger than any purchase value
    let value = if months == 0 {
        purchase_value
    } else {
        match purchase_value
            .checked_mul(monthly_rate)
            .and_then(|d| d.checked_mul(Decimal::from(months)))
        {
            Some(depreciation) => (purchase_value - depreciation).max(Decimal::ZERO),
            None => Decimal::ZERO,
        }
    };

    if settings.round_to_nearest_integer {
        value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    } else {
        value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
    }
}

pub fn compute_book_value(asset: &Asset, settings: &Settings, now: DateTime<Utc>) -> Decimal {
    book_value(asset.purchase_value, asset.purchase_date, settings, now)
}

/// Display form of an asset. `show_value` hides the book value from callers
/// not allowed to see it; the threshold flags are still computed.
pub fn view(asset: Asset, settings: &Settings, now: DateTime<Utc>, show_value: bool) -> AssetView {
    let value = compute_book_value(&asset, settings, now);
    let age_months = months_elapsed(asset.purchase_date, now.date_naive());

    AssetView {
        book_value: show_value.then_some(value),
        age_months,
        below_value_threshold: value <= settings.min_asset_value_threshold,
        e_waste_candidate: settings.auto_mark_e_waste && value.is_zero(),
        asset,
    }
}
