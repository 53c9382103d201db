use chrono::NaiveDate;

use super::domain::{ComplianceRecord, ComplianceStatus, Vehicle};

/// Records expiring within this many days (inclusive) are flagged as expiring soon.
///
/// The window is global; a record's `alert_days_before` only gates reminders.
pub const EXPIRING_SOON_WINDOW_DAYS: i64 = 30;

/// Classify a record against its parent vehicle on the given day.
///
/// Draft state wins over everything else, then a missing expiry date. An expiry
/// falling on `today` is already expired.
pub fn classify_record(
    record: &ComplianceRecord,
    vehicle: &Vehicle,
    today: NaiveDate,
) -> ComplianceStatus {
    if vehicle.is_draft || record.is_draft {
        return ComplianceStatus::Draft;
    }

    classify_expiry(record.expiry_date, today)
}

/// Date-only part of the classification, shared by exports and audits.
pub fn classify_expiry(expiry_date: Option<NaiveDate>, today: NaiveDate) -> ComplianceStatus {
    let Some(expiry) = expiry_date else {
        return ComplianceStatus::Missing;
    };

    let delta = (expiry - today).num_days();
    if delta <= 0 {
        ComplianceStatus::Critical
    } else if delta <= EXPIRING_SOON_WINDOW_DAYS {
        ComplianceStatus::Warning
    } else {
        ComplianceStatus::Healthy
    }
}

/// Whole days between `today` and the expiry date; negative once expired.
pub fn days_until_expiry(record: &ComplianceRecord, today: NaiveDate) -> Option<i64> {
    record.expiry_date.map(|expiry| (expiry - today).num_days())
}
