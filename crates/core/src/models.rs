//! Domain enumerations and validated inputs.
//!
//! Read models are the `api_shared::pb` response types built straight from storage rows.
//! This module holds what flows the other way: checked inputs built from request bodies, and
//! the closed sets of values stored as text columns.

use crate::constants::{MAX_FREE_TEXT_LEN, MAX_LABEL_LEN};
use crate::error::{ClinicaError, ClinicaResult};
use crate::validation::{
    bounded_text, optional_text, parse_birth_date, validate_height_m, validate_weight_kg,
};
use api_shared::pb;
use chrono::{NaiveDate, Utc};
use clinica_types::{EmailAddress, NationalId, NonEmptyText, PersonName, PhoneNumber};
use std::fmt;
use std::str::FromStr;

macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ClinicaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| ClinicaError::InvalidInput(format!("unknown {} '{}'", $label, s)))
            }
        }
    };
}

/// Status shared by admissions and clinical records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdmissionStatus {
    InTreatment,
    PreOperative,
    Discharged,
}

text_enum!(AdmissionStatus, "status", {
    InTreatment => "in_treatment",
    PreOperative => "pre_operative",
    Discharged => "discharged",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    Other,
}

text_enum!(Sex, "sex", {
    Male => "M",
    Female => "F",
    Other => "O",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BloodType {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
    ONegative,
}

text_enum!(BloodType, "blood type", {
    APositive => "A+",
    ANegative => "A-",
    BPositive => "B+",
    BNegative => "B-",
    AbPositive => "AB+",
    AbNegative => "AB-",
    OPositive => "O+",
    ONegative => "O-",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CenterKind {
    Hospital,
    Cesfam,
}

text_enum!(CenterKind, "center kind", {
    Hospital => "hospital",
    Cesfam => "cesfam",
});

/// Identity and contact data of a patient, as entered by intake staff.
#[derive(Clone, Debug)]
pub struct NewPatient {
    pub national_id: NationalId,
    pub given_names: PersonName,
    pub last_names: PersonName,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
    pub sex: Option<Sex>,
}

impl TryFrom<pb::PatientReq> for NewPatient {
    type Error = ClinicaError;

    fn try_from(req: pb::PatientReq) -> ClinicaResult<Self> {
        Ok(Self {
            national_id: NationalId::new(&req.national_id)
                .map_err(ClinicaError::field("national_id"))?,
            given_names: PersonName::new(&req.given_names)
                .map_err(ClinicaError::field("given_names"))?,
            last_names: PersonName::new(&req.last_names)
                .map_err(ClinicaError::field("last_names"))?,
            email: optional_text(req.email)
                .map(EmailAddress::new)
                .transpose()
                .map_err(ClinicaError::field("email"))?,
            phone: optional_text(req.phone)
                .map(PhoneNumber::new)
                .transpose()
                .map_err(ClinicaError::field("phone"))?,
            sex: optional_text(req.sex)
                .map(|s| s.parse::<Sex>())
                .transpose()?,
        })
    }
}

/// Clinical subset of a patient, edited by physicians.
///
/// Every field replaces the stored value, so `None` clears it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClinicalAttributes {
    pub weight_kg: Option<f64>,
    pub height_m: Option<f64>,
    pub blood_type: Option<BloodType>,
    pub birth_date: Option<NaiveDate>,
    pub allergy_notes: Option<String>,
}

impl ClinicalAttributes {
    pub fn from_request(req: pb::PatientClinicalReq, today: NaiveDate) -> ClinicaResult<Self> {
        let allergy_notes = optional_text(req.allergy_notes)
            .map(|notes| bounded_text("allergy notes", &notes, MAX_FREE_TEXT_LEN))
            .transpose()?;

        Ok(Self {
            weight_kg: validate_weight_kg(req.weight_kg)?,
            height_m: validate_height_m(req.height_m)?,
            blood_type: optional_text(req.blood_type)
                .map(|b| b.parse::<BloodType>())
                .transpose()?,
            birth_date: optional_text(req.birth_date)
                .map(|d| parse_birth_date(&d, today))
                .transpose()?,
            allergy_notes,
        })
    }
}

impl TryFrom<pb::PatientClinicalReq> for ClinicalAttributes {
    type Error = ClinicaError;

    fn try_from(req: pb::PatientClinicalReq) -> ClinicaResult<Self> {
        Self::from_request(req, Utc::now().date_naive())
    }
}

/// Placement of an admission: which patient goes where.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdmissionPlacement {
    pub patient_id: i64,
    pub center_id: i64,
    pub area_id: i64,
}

impl From<&pb::CreateAdmissionReq> for AdmissionPlacement {
    fn from(req: &pb::CreateAdmissionReq) -> Self {
        Self {
            patient_id: req.patient_id,
            center_id: req.center_id,
            area_id: req.area_id,
        }
    }
}

impl From<&pb::UpdateAdmissionReq> for AdmissionPlacement {
    fn from(req: &pb::UpdateAdmissionReq) -> Self {
        Self {
            patient_id: req.patient_id,
            center_id: req.center_id,
            area_id: req.area_id,
        }
    }
}

/// Parses the optional status of an admission edit. Discharge is not a plain status edit.
pub fn parse_open_status(value: Option<String>) -> ClinicaResult<Option<AdmissionStatus>> {
    let status = optional_text(value)
        .map(|s| s.parse::<AdmissionStatus>())
        .transpose()?;
    if status == Some(AdmissionStatus::Discharged) {
        return Err(ClinicaError::InvalidInput(
            "use the discharge operation to discharge an admission".into(),
        ));
    }
    Ok(status)
}

/// Editable fields of a clinical record.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordFields {
    pub current_status: AdmissionStatus,
    pub sector: String,
    pub subsector: String,
    pub treatment_summary: String,
}

impl RecordFields {
    fn build(
        current_status: AdmissionStatus,
        sector: &str,
        subsector: &str,
        treatment_summary: &str,
    ) -> ClinicaResult<Self> {
        Ok(Self {
            current_status,
            sector: bounded_text("sector", sector, MAX_LABEL_LEN)?,
            subsector: bounded_text("subsector", subsector, MAX_LABEL_LEN)?,
            treatment_summary: bounded_text(
                "treatment summary",
                treatment_summary,
                MAX_FREE_TEXT_LEN,
            )?,
        })
    }
}

/// A clinical record to open on an admission.
#[derive(Clone, Debug, PartialEq)]
pub struct NewClinicalRecord {
    /// `None` makes the acting physician responsible.
    pub responsible_physician_id: Option<i64>,
    pub fields: RecordFields,
}

impl TryFrom<pb::CreateRecordReq> for NewClinicalRecord {
    type Error = ClinicaError;

    fn try_from(req: pb::CreateRecordReq) -> ClinicaResult<Self> {
        let status = optional_text(req.current_status)
            .map(|s| s.parse::<AdmissionStatus>())
            .transpose()?
            .unwrap_or(AdmissionStatus::InTreatment);
        Ok(Self {
            responsible_physician_id: req.responsible_physician_id,
            fields: RecordFields::build(
                status,
                &req.sector,
                &req.subsector,
                &req.treatment_summary,
            )?,
        })
    }
}

/// Changes to a clinical record, optionally with the patient's clinical subset.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordUpdate {
    pub fields: RecordFields,
    pub responsible_physician_id: Option<i64>,
    pub clinical: Option<ClinicalAttributes>,
}

impl TryFrom<pb::UpdateRecordReq> for RecordUpdate {
    type Error = ClinicaError;

    fn try_from(req: pb::UpdateRecordReq) -> ClinicaResult<Self> {
        let status = req.current_status.parse::<AdmissionStatus>()?;
        Ok(Self {
            fields: RecordFields::build(
                status,
                &req.sector,
                &req.subsector,
                &req.treatment_summary,
            )?,
            responsible_physician_id: req.responsible_physician_id,
            clinical: req.clinical.map(ClinicalAttributes::try_from).transpose()?,
        })
    }
}

/// Free text of a note or of discharge details.
pub fn clinical_text(field: &'static str, value: &str) -> ClinicaResult<NonEmptyText> {
    let text = NonEmptyText::new(value).map_err(ClinicaError::field(field))?;
    bounded_text(field, text.as_str(), MAX_FREE_TEXT_LEN)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient_req() -> pb::PatientReq {
        pb::PatientReq {
            national_id: "11111111-1".into(),
            given_names: "Ana".into(),
            last_names: "Silva".into(),
            email: Some("ana.silva@saludmaule.cl".into()),
            phone: Some("+56911111110".into()),
            sex: Some("F".into()),
        }
    }

    #[test]
    fn status_parses_wire_names() {
        assert_eq!(
            "pre_operative".parse::<AdmissionStatus>().unwrap(),
            AdmissionStatus::PreOperative
        );
        assert!("alta".parse::<AdmissionStatus>().is_err());
        assert_eq!("ab+".parse::<BloodType>().unwrap(), BloodType::AbPositive);
    }

    #[test]
    fn new_patient_accepts_valid_request() {
        let patient = NewPatient::try_from(patient_req()).expect("valid request");
        assert_eq!(patient.national_id.as_str(), "11111111-1");
        assert_eq!(patient.sex, Some(Sex::Female));
    }

    #[test]
    fn new_patient_blank_optionals_become_none() {
        let mut req = patient_req();
        req.email = Some("  ".into());
        req.phone = None;
        req.sex = Some(String::new());
        let patient = NewPatient::try_from(req).expect("valid request");
        assert!(patient.email.is_none());
        assert!(patient.phone.is_none());
        assert!(patient.sex.is_none());
    }

    #[test]
    fn new_patient_reports_malformed_fields() {
        let mut req = patient_req();
        req.phone = Some("12-34".into());
        let err = NewPatient::try_from(req).expect_err("phone is malformed");
        assert!(matches!(err, ClinicaError::InvalidField { field: "phone", .. }));

        let mut req = patient_req();
        req.given_names = "Ana 2".into();
        let err = NewPatient::try_from(req).expect_err("name is malformed");
        assert!(matches!(err, ClinicaError::InvalidField { field: "given_names", .. }));
    }

    #[test]
    fn clinical_attributes_enforce_ranges() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let ok = ClinicalAttributes::from_request(
            pb::PatientClinicalReq {
                weight_kg: Some(70.0),
                height_m: Some(1.7),
                blood_type: Some("O+".into()),
                birth_date: Some("1990-05-04".into()),
                allergy_notes: Some("Penicilina".into()),
            },
            today,
        )
        .expect("valid clinical data");
        assert_eq!(ok.blood_type, Some(BloodType::OPositive));

        let err = ClinicalAttributes::from_request(
            pb::PatientClinicalReq {
                weight_kg: Some(900.0),
                ..Default::default()
            },
            today,
        );
        assert!(err.is_err());
    }

    #[test]
    fn admission_edit_cannot_set_discharged() {
        assert_eq!(parse_open_status(None).unwrap(), None);
        assert_eq!(
            parse_open_status(Some("pre_operative".into())).unwrap(),
            Some(AdmissionStatus::PreOperative)
        );
        assert!(parse_open_status(Some("discharged".into())).is_err());
    }

    #[test]
    fn record_request_defaults_status() {
        let record = NewClinicalRecord::try_from(pb::CreateRecordReq {
            sector: "Box 3".into(),
            ..Default::default()
        })
        .expect("valid record");
        assert_eq!(record.fields.current_status, AdmissionStatus::InTreatment);
        assert_eq!(record.fields.sector, "Box 3");
        assert_eq!(record.responsible_physician_id, None);
    }

    #[test]
    fn clinical_text_rejects_blank() {
        assert!(clinical_text("detail", "   ").is_err());
        assert_eq!(clinical_text("detail", " ok ").unwrap().as_str(), "ok");
    }
}
