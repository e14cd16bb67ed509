//! Role-based access control.
//!
//! Staff hold exactly one [`Role`]. Every protected core operation names itself as an
//! [`Operation`] and calls [`RequestContext::require`] before touching storage. The allowed
//! role set of each operation lives in [`Operation::allowed_roles`], so the whole policy can be
//! read in one place.
//!
//! Missing credentials and a role outside the allowed set are both authorization failures,
//! never validation failures.

use crate::error::{ClinicaError, ClinicaResult};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    AdministrativeIntake,
    Physician,
    Director,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::AdministrativeIntake, Role::Physician, Role::Director];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::AdministrativeIntake => "administrative_intake",
            Role::Physician => "physician",
            Role::Director => "director",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClinicaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| ClinicaError::InvalidInput(format!("unknown role '{s}'")))
    }
}

const INTAKE: &[Role] = &[Role::AdministrativeIntake];
const PHYSICIAN: &[Role] = &[Role::Physician];
const DIRECTOR: &[Role] = &[Role::Director];
const PHYSICIAN_OR_INTAKE: &[Role] = &[Role::AdministrativeIntake, Role::Physician];
const PHYSICIAN_OR_DIRECTOR: &[Role] = &[Role::Physician, Role::Director];
const ANY_STAFF: &[Role] = &Role::ALL;

/// Protected operations of the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    CreatePatient,
    UpdatePatient,
    ViewPatients,
    CreateAdmission,
    UpdateAdmission,
    ReactivateAdmission,
    DeleteAdmission,
    DischargeAdmission,
    ViewAdmissions,
    ViewActiveAdmissions,
    CreateClinicalRecord,
    UpdateClinicalRecord,
    ListOwnClinicalRecords,
    ViewClinicalRecord,
    RenderRecordDocument,
    CreateNote,
    ViewAllergyCatalog,
    TagPatientAllergy,
    ViewPhysicianReport,
    ViewAdmissionSummary,
    ManageStaff,
    ViewReferenceData,
}

impl Operation {
    pub fn allowed_roles(self) -> &'static [Role] {
        use Operation::*;
        match self {
            CreatePatient | UpdatePatient => INTAKE,
            ViewPatients | ViewAdmissions => PHYSICIAN_OR_INTAKE,
            CreateAdmission | UpdateAdmission | ReactivateAdmission | DeleteAdmission => INTAKE,
            DischargeAdmission => PHYSICIAN_OR_INTAKE,
            ViewActiveAdmissions => PHYSICIAN,
            CreateClinicalRecord | UpdateClinicalRecord | ListOwnClinicalRecords | CreateNote => {
                PHYSICIAN
            }
            ViewClinicalRecord | RenderRecordDocument => PHYSICIAN_OR_DIRECTOR,
            ViewAllergyCatalog => PHYSICIAN_OR_INTAKE,
            TagPatientAllergy => PHYSICIAN,
            ViewPhysicianReport | ViewAdmissionSummary | ManageStaff => DIRECTOR,
            ViewReferenceData => ANY_STAFF,
        }
    }

    pub fn is_allowed_for(self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    pub fn as_str(&self) -> &'static str {
        use Operation::*;
        match self {
            CreatePatient => "create patients",
            UpdatePatient => "update patients",
            ViewPatients => "view patients",
            CreateAdmission => "create admissions",
            UpdateAdmission => "update admissions",
            ReactivateAdmission => "reactivate admissions",
            DeleteAdmission => "delete admissions",
            DischargeAdmission => "discharge admissions",
            ViewAdmissions => "view admissions",
            ViewActiveAdmissions => "view the active admission worklist",
            CreateClinicalRecord => "create clinical records",
            UpdateClinicalRecord => "update clinical records",
            ListOwnClinicalRecords => "list own clinical records",
            ViewClinicalRecord => "view clinical records",
            RenderRecordDocument => "render clinical record documents",
            CreateNote => "write clinical notes",
            ViewAllergyCatalog => "view the allergy catalog",
            TagPatientAllergy => "tag patient allergies",
            ViewPhysicianReport => "view the physician report",
            ViewAdmissionSummary => "view the admission summary",
            ManageStaff => "manage staff",
            ViewReferenceData => "view reference data",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated staff member performing a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub staff_id: i64,
    pub role: Role,
    pub display_name: String,
}

/// Explicit per-request state passed into every protected operation.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    actor: Option<Actor>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { actor: None }
    }

    pub fn for_actor(actor: Actor) -> Self {
        Self { actor: Some(actor) }
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// Checks that the acting staff member may perform `operation`.
    ///
    /// # Errors
    ///
    /// - [`ClinicaError::Unauthenticated`] when no staff member is attached
    /// - [`ClinicaError::Forbidden`] when the role is not in the operation's allowed set
    pub fn require(&self, operation: Operation) -> ClinicaResult<&Actor> {
        let Some(actor) = self.actor.as_ref() else {
            tracing::warn!(%operation, "rejected anonymous request");
            return Err(ClinicaError::Unauthenticated { operation });
        };

        if !operation.is_allowed_for(actor.role) {
            tracing::warn!(
                staff_id = actor.staff_id,
                role = %actor.role,
                %operation,
                "rejected request for role"
            );
            return Err(ClinicaError::Forbidden {
                role: actor.role,
                operation,
            });
        }

        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ctx(role: Role) -> RequestContext {
        RequestContext::for_actor(Actor {
            staff_id: 7,
            role,
            display_name: "Test Staff".into(),
        })
    }

    #[test]
    fn role_round_trips_through_its_wire_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("medico".parse::<Role>().is_err());
    }

    #[test]
    fn physician_can_write_notes_but_intake_cannot() {
        assert!(ctx(Role::Physician).require(Operation::CreateNote).is_ok());

        let err = ctx(Role::AdministrativeIntake)
            .require(Operation::CreateNote)
            .expect_err("intake staff must not write notes");
        assert!(matches!(
            err,
            ClinicaError::Forbidden {
                role: Role::AdministrativeIntake,
                operation: Operation::CreateNote
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn anonymous_requests_are_authorization_failures() {
        let err = RequestContext::anonymous()
            .require(Operation::ViewReferenceData)
            .expect_err("anonymous access must fail");
        assert!(matches!(err, ClinicaError::Unauthenticated { .. }));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn listing_is_shared_by_physicians_and_intake_only() {
        for op in [Operation::ViewPatients, Operation::ViewAdmissions] {
            assert!(op.is_allowed_for(Role::Physician));
            assert!(op.is_allowed_for(Role::AdministrativeIntake));
            assert!(!op.is_allowed_for(Role::Director));
        }
    }

    #[test]
    fn director_only_reports() {
        for op in [
            Operation::ViewPhysicianReport,
            Operation::ViewAdmissionSummary,
            Operation::ManageStaff,
        ] {
            assert_eq!(op.allowed_roles(), &[Role::Director]);
        }
    }

    #[test]
    fn require_returns_the_actor() {
        let context = ctx(Role::Director);
        let actor = context
            .require(Operation::ViewPhysicianReport)
            .expect("director may view the report");
        assert_eq!(actor.staff_id, 7);
    }
}
