//! Reminder planning: which records are inside their alert window, which
//! configured threshold is due, and how the reminder e-mail reads.
//!
//! Delivery is handled outside this crate; the planner only produces notices.

use super::classifier::{classify_record, days_until_expiry};
use super::domain::{
    ComplianceRecord, ComplianceStatus, DocumentType, RecordId, TenantId, Vehicle, VehicleId,
};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reminder thresholds offered by the automation settings screen.
pub const DEFAULT_THRESHOLDS: [u32; 5] = [30, 15, 7, 3, 1];

/// Tenant-level reminder automation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationConfig {
    pub tenant_id: TenantId,
    pub recipients: Vec<String>,
    pub default_thresholds: Vec<u32>,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_template: Option<ReminderTemplate>,
}

impl AutomationConfig {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            recipients: Vec::new(),
            default_thresholds: DEFAULT_THRESHOLDS.to_vec(),
            enabled: true,
            email_template: None,
        }
    }

    /// Add a recipient, ignoring blanks, addresses without `@`, and duplicates.
    pub fn add_recipient(&mut self, email: &str) -> bool {
        let trimmed = email.trim();
        if trimmed.is_empty() || !trimmed.contains('@') {
            return false;
        }
        if self.recipients.iter().any(|existing| existing == trimmed) {
            return false;
        }
        self.recipients.push(trimmed.to_string());
        true
    }

    pub fn remove_recipient(&mut self, email: &str) -> bool {
        let before = self.recipients.len();
        self.recipients.retain(|existing| existing != email.trim());
        self.recipients.len() != before
    }

    /// Toggle a threshold on or off, keeping the list sorted from largest to smallest.
    pub fn toggle_threshold(&mut self, days: u32) {
        if let Some(position) = self.default_thresholds.iter().position(|&t| t == days) {
            self.default_thresholds.remove(position);
        } else {
            self.default_thresholds.push(days);
            self.default_thresholds.sort_unstable_by(|a, b| b.cmp(a));
        }
    }

    pub fn template(&self) -> ReminderTemplate {
        self.email_template.clone().unwrap_or_default()
    }
}

/// A reminder the dispatcher should send for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderNotice {
    pub record_id: RecordId,
    pub vehicle_id: VehicleId,
    pub registration_number: String,
    pub document_type: DocumentType,
    pub document_label: &'static str,
    pub expiry_date: NaiveDate,
    pub days_remaining: i64,
    pub threshold_days: u32,
}

/// Whether the record's own lead time has been reached.
///
/// Drafts, records with alerts off, and records without an expiry never open a window.
pub fn alert_window_open(record: &ComplianceRecord, vehicle: &Vehicle, today: NaiveDate) -> bool {
    if !record.alert_enabled {
        return false;
    }

    match classify_record(record, vehicle, today) {
        ComplianceStatus::Draft | ComplianceStatus::Missing => false,
        _ => record.expiry_date.is_some_and(|expiry| {
            // A lead time reaching past the calendar start opens the window immediately.
            expiry
                .checked_sub_days(Days::new(u64::from(record.alert_days_before)))
                .map_or(true, |opens_on| today >= opens_on)
        }),
    }
}

/// Pick the threshold that is due for a record, if any.
///
/// The tightest configured threshold covering the remaining days wins, unless
/// it was already sent for this record.
pub fn due_threshold(thresholds: &[u32], sent: &[u32], days_remaining: i64) -> Option<u32> {
    if days_remaining <= 0 {
        return None;
    }

    thresholds
        .iter()
        .copied()
        .filter(|&threshold| days_remaining <= i64::from(threshold))
        .min()
        .filter(|threshold| !sent.contains(threshold))
}

/// Plan reminder notices for a tenant on the given day, soonest expiry first.
pub fn plan_reminders(
    config: &AutomationConfig,
    vehicles: &[Vehicle],
    records: &[ComplianceRecord],
    today: NaiveDate,
) -> Vec<ReminderNotice> {
    if !config.enabled || config.default_thresholds.is_empty() {
        return Vec::new();
    }

    let index: HashMap<&VehicleId, &Vehicle> = vehicles.iter().map(|v| (&v.id, v)).collect();

    let mut notices: Vec<ReminderNotice> = records
        .iter()
        .filter(|record| record.alert_enabled)
        .filter_map(|record| {
            let vehicle = index.get(&record.vehicle_id)?;
            if classify_record(record, vehicle, today) == ComplianceStatus::Draft {
                return None;
            }
            let expiry_date = record.expiry_date?;
            let days_remaining = days_until_expiry(record, today)?;
            let threshold_days =
                due_threshold(&config.default_thresholds, &record.sent_reminders, days_remaining)?;

            Some(ReminderNotice {
                record_id: record.id.clone(),
                vehicle_id: vehicle.id.clone(),
                registration_number: vehicle.registration_number.clone(),
                document_type: record.document_type,
                document_label: record.document_type.label(),
                expiry_date,
                days_remaining,
                threshold_days,
            })
        })
        .collect();

    notices.sort_by(|a, b| {
        a.days_remaining
            .cmp(&b.days_remaining)
            .then_with(|| a.registration_number.cmp(&b.registration_number))
    });
    notices
}

pub const PLACEHOLDER_VEHICLE_NUMBER: &str = "{{Vehicle Number}}";
pub const PLACEHOLDER_DOCUMENT_TYPE: &str = "{{Document Type}}";
pub const PLACEHOLDER_EXPIRY_DATE: &str = "{{Expiry Date}}";
pub const PLACEHOLDER_REMAINING_DAYS: &str = "{{Remaining Days}}";

/// Subject/body pair with `{{...}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTemplate {
    pub subject: String,
    pub body: String,
}

impl Default for ReminderTemplate {
    fn default() -> Self {
        Self {
            subject: "Vehicle Document Expiry Reminder - {{Document Type}}".to_string(),
            body: [
                "Hello,",
                "This is a reminder that the following vehicle document is nearing expiry:",
                "Vehicle Number: {{Vehicle Number}}",
                "Document Type: {{Document Type}}",
                "Expiry Date: {{Expiry Date}}",
                "Days Remaining: {{Remaining Days}}",
                "Please ensure the document is renewed before the expiry date.",
                "Regards,",
                "Vehicle Compliance System",
            ]
            .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReminder {
    pub subject: String,
    pub body: String,
}

impl ReminderTemplate {
    pub fn render(&self, notice: &ReminderNotice) -> RenderedReminder {
        RenderedReminder {
            subject: fill_placeholders(&self.subject, notice),
            body: fill_placeholders(&self.body, notice),
        }
    }
}

fn fill_placeholders(template: &str, notice: &ReminderNotice) -> String {
    template
        .replace(PLACEHOLDER_VEHICLE_NUMBER, &notice.registration_number)
        .replace(PLACEHOLDER_DOCUMENT_TYPE, notice.document_label)
        .replace(PLACEHOLDER_EXPIRY_DATE, &notice.expiry_date.to_string())
        .replace(PLACEHOLDER_REMAINING_DAYS, &notice.days_remaining.to_string())
}
