use tillpoint_auth::Role;
use tillpoint_core::StaffId;

/// Authenticated staff identity for a request.
///
/// Inserted by the auth middleware; must be present for all protected routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffContext {
    staff_id: StaffId,
    role: Role,
}

impl StaffContext {
    pub fn new(staff_id: StaffId, role: Role) -> Self {
        Self { staff_id, role }
    }

    pub fn staff_id(&self) -> StaffId {
        self.staff_id
    }

    pub fn role(&self) -> &Role {
        &self.role
    }
}
