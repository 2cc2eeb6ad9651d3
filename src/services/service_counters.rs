//! Derived per-asset service counters
//!
//! Counters are always recomputed from the full set of service records,
//! never adjusted incrementally.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{asset_service::ServiceCounters, Asset, AssetService, ServiceStatus},
    repository::{Versioned, WriteBatch},
};

/// Tally service records per asset id
pub fn tally<'a, I>(services: I) -> HashMap<Uuid, ServiceCounters>
where
    I: IntoIterator<Item = &'a AssetService>,
{
    let mut counters: HashMap<Uuid, ServiceCounters> = HashMap::new();
    for service in services {
        let entry = counters.entry(service.asset_id).or_default();
        entry.total += 1;
        match service.status {
            ServiceStatus::UncompletedPending => entry.open += 1,
            ServiceStatus::CompletedClosed => entry.closed += 1,
        }
        if entry.last_service_date.map_or(true, |d| service.date_of_service > d) {
            entry.last_service_date = Some(service.date_of_service);
        }
    }
    counters
}

fn current(asset: &Asset) -> ServiceCounters {
    ServiceCounters {
        total: asset.total_services,
        open: asset.open_services,
        closed: asset.closed_services,
        last_service_date: asset.last_service_date,
    }
}

/// Stage counter updates for every asset whose stored counters differ from
/// the recomputed ones. Returns the ids of the assets that changed.
pub fn stage_sync(
    batch: &mut WriteBatch,
    assets: Vec<Versioned<Asset>>,
    services: &[AssetService],
    now: DateTime<Utc>,
) -> AppResult<Vec<Uuid>> {
    let counters = tally(services);
    let mut changed = Vec::new();

    for mut asset in assets {
        let expected = counters.get(&asset.id).copied().unwrap_or_default();
        if current(&asset) == expected {
            continue;
        }
        asset.total_services = expected.total;
        asset.open_services = expected.open;
        asset.closed_services = expected.closed;
        asset.last_service_date = expected.last_service_date;
        asset.updated_at = now;
        batch.update(&asset)?;
        changed.push(asset.id);
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn record(asset_id: Uuid, status: ServiceStatus, day: u32) -> AssetService {
        let now = Utc::now();
        AssetService {
            id: Uuid::new_v4(),
            asset_id,
            asset_code: "LAP-001".to_string(),
            asset_type: None,
            brand: None,
            model: None,
            serial_number: None,
            user_id: None,
            user_name: None,
            date_of_service: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            date_of_close: None,
            category: None,
            technician_name: None,
            summary: "Keyboard replaced".to_string(),
            status,
            parts_cost: Decimal::ZERO,
            invoice_reference: None,
            conclusion: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tally_counts_by_asset_and_status() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let services = vec![
            record(a, ServiceStatus::CompletedClosed, 3),
            record(a, ServiceStatus::UncompletedPending, 9),
            record(a, ServiceStatus::CompletedClosed, 5),
            record(b, ServiceStatus::UncompletedPending, 1),
        ];

        let counters = tally(&services);
        let for_a = counters[&a];
        assert_eq!((for_a.total, for_a.open, for_a.closed), (3, 1, 2));
        assert_eq!(for_a.last_service_date, NaiveDate::from_ymd_opt(2024, 4, 9));
        assert_eq!(counters[&b].total, 1);
        assert!(!counters.contains_key(&Uuid::new_v4()));
    }
}
