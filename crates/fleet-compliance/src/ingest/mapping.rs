use super::normalizer::normalize_key;
use crate::compliance::domain::{DocumentType, VehicleCategory};
use std::collections::HashMap;
use std::sync::OnceLock;

static DOCUMENT_TYPE_MAP: OnceLock<HashMap<String, DocumentType>> = OnceLock::new();

/// Resolve a persisted document type. Accepts display labels ("Insurance Validity"),
/// enum keys ("INSURANCE", "NP_TAX") and snake_case names.
pub(crate) fn document_type_for(value: &str) -> Option<DocumentType> {
    document_type_map().get(&normalize_key(value)).copied()
}

fn document_type_map() -> &'static HashMap<String, DocumentType> {
    DOCUMENT_TYPE_MAP.get_or_init(|| {
        const ALIASES: &[(&str, DocumentType)] = &[
            ("RC", DocumentType::RegistrationCertificate),
            ("RC Validity", DocumentType::RegistrationCertificate),
            ("registration_certificate", DocumentType::RegistrationCertificate),
            ("PERMIT", DocumentType::Permit),
            ("Permit Validity", DocumentType::Permit),
            ("INSURANCE", DocumentType::Insurance),
            ("Insurance Validity", DocumentType::Insurance),
            ("NP_TAX", DocumentType::NationalPermitTax),
            ("NP Tax", DocumentType::NationalPermitTax),
            ("national_permit_tax", DocumentType::NationalPermitTax),
            ("MV_TAX", DocumentType::MotorVehicleTax),
            ("MV Tax", DocumentType::MotorVehicleTax),
            ("motor_vehicle_tax", DocumentType::MotorVehicleTax),
            ("FITNESS", DocumentType::FitnessCertificate),
            ("Fitness Certificate", DocumentType::FitnessCertificate),
            ("POLLUTION", DocumentType::PollutionCertificate),
            ("PUC", DocumentType::PollutionCertificate),
            ("Pollution (PUC)", DocumentType::PollutionCertificate),
            ("pollution_certificate", DocumentType::PollutionCertificate),
        ];

        ALIASES
            .iter()
            .map(|(alias, document_type)| (normalize_key(alias), *document_type))
            .collect()
    })
}

pub(crate) fn category_for(value: &str) -> Option<VehicleCategory> {
    match normalize_key(value).as_str() {
        "truck" => Some(VehicleCategory::Truck),
        "bus" => Some(VehicleCategory::Bus),
        "car" => Some(VehicleCategory::Car),
        "lorry" => Some(VehicleCategory::Lorry),
        _ => None,
    }
}
