use super::super::classifier::{classify_record, days_until_expiry};
use super::super::domain::{ComplianceRecord, ComplianceStatus, Vehicle, VehicleId};
use super::views::{FleetSummary, RecordStatusView, VehicleHealthEntry};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone, Copy)]
struct VehicleTally {
    records: usize,
    worst: Option<ComplianceStatus>,
}

impl VehicleTally {
    fn observe(&mut self, status: ComplianceStatus) {
        self.records += 1;
        self.worst = match self.worst {
            Some(current) if current.severity_rank() >= status.severity_rank() => Some(current),
            _ => Some(status),
        };
    }

    fn is_healthy(&self) -> bool {
        self.records > 0 && self.worst.is_some_and(ComplianceStatus::is_compliant)
    }
}

fn vehicle_index(vehicles: &[Vehicle]) -> HashMap<&VehicleId, &Vehicle> {
    let mut index = HashMap::with_capacity(vehicles.len());
    for vehicle in vehicles {
        index.entry(&vehicle.id).or_insert(vehicle);
    }
    index
}

/// Aggregate record statuses into tenant-wide counts and fleet health.
///
/// Records whose vehicle is absent from `vehicles` are only reported through
/// `orphaned_count`. A published vehicle with no records is never healthy.
pub fn aggregate(vehicles: &[Vehicle], records: &[ComplianceRecord], today: NaiveDate) -> FleetSummary {
    let index = vehicle_index(vehicles);
    let mut tallies: HashMap<&VehicleId, VehicleTally> = HashMap::new();

    let mut expired_count = 0;
    let mut missing_count = 0;
    let mut expiring_soon_count = 0;
    let mut healthy_count = 0;
    let mut draft_count = 0;
    let mut orphaned_count = 0;

    for record in records {
        let Some(vehicle) = index.get(&record.vehicle_id) else {
            orphaned_count += 1;
            continue;
        };

        let status = classify_record(record, vehicle, today);
        match status {
            ComplianceStatus::Draft => draft_count += 1,
            ComplianceStatus::Missing => {
                expired_count += 1;
                missing_count += 1;
            }
            ComplianceStatus::Critical => expired_count += 1,
            ComplianceStatus::Warning => expiring_soon_count += 1,
            ComplianceStatus::Healthy => healthy_count += 1,
        }

        if vehicle.is_published() {
            tallies.entry(&vehicle.id).or_default().observe(status);
        }
    }

    let mut seen = HashSet::new();
    let vehicle_health: Vec<VehicleHealthEntry> = vehicles
        .iter()
        .filter(|vehicle| vehicle.is_published() && seen.insert(&vehicle.id))
        .map(|vehicle| {
            let tally = tallies.get(&vehicle.id).copied().unwrap_or_default();
            VehicleHealthEntry {
                vehicle_id: vehicle.id.clone(),
                registration_number: vehicle.registration_number.clone(),
                record_count: tally.records,
                worst_status: tally.worst,
                worst_status_label: tally.worst.map(ComplianceStatus::label),
                healthy: tally.is_healthy(),
            }
        })
        .collect();

    let published_vehicle_count = vehicle_health.len();
    let draft_vehicle_count = index.values().filter(|vehicle| vehicle.is_draft).count();
    let healthy_vehicle_count = vehicle_health.iter().filter(|entry| entry.healthy).count();

    FleetSummary {
        expired_count,
        missing_count,
        expiring_soon_count,
        healthy_count,
        draft_count,
        orphaned_count,
        published_vehicle_count,
        draft_vehicle_count,
        healthy_vehicle_count,
        fleet_health_pct: fleet_health_pct(healthy_vehicle_count, published_vehicle_count),
        vehicle_health,
    }
}

/// Rounded share of healthy published vehicles; zero when nothing is published.
pub fn fleet_health_pct(healthy: usize, published: usize) -> u8 {
    if published == 0 {
        return 0;
    }

    let pct = (healthy as f64 / published as f64) * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}

/// Distinct published vehicles with at least one alert-enabled record.
///
/// Display only; nothing schedules from this number.
pub fn monitored_vehicle_count(vehicles: &[Vehicle], records: &[ComplianceRecord]) -> usize {
    let index = vehicle_index(vehicles);
    records
        .iter()
        .filter(|record| record.alert_enabled)
        .filter_map(|record| index.get(&record.vehicle_id))
        .filter(|vehicle| vehicle.is_published())
        .map(|vehicle| &vehicle.id)
        .collect::<HashSet<_>>()
        .len()
}

/// Classified view of every record with a known vehicle, in input order.
pub fn record_statuses(
    vehicles: &[Vehicle],
    records: &[ComplianceRecord],
    today: NaiveDate,
) -> Vec<RecordStatusView> {
    let index = vehicle_index(vehicles);
    records
        .iter()
        .filter_map(|record| {
            index
                .get(&record.vehicle_id)
                .map(|vehicle| status_view(record, vehicle, today))
        })
        .collect()
}

pub(crate) fn status_view(
    record: &ComplianceRecord,
    vehicle: &Vehicle,
    today: NaiveDate,
) -> RecordStatusView {
    let status = classify_record(record, vehicle, today);
    RecordStatusView {
        record_id: record.id.clone(),
        vehicle_id: vehicle.id.clone(),
        registration_number: vehicle.registration_number.clone(),
        document_type: record.document_type,
        document_label: record.document_type.label(),
        expiry_date: record.expiry_date,
        days_remaining: days_until_expiry(record, today),
        status,
        status_label: status.label(),
    }
}
