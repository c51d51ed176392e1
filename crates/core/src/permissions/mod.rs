//! Permission system for back-office operations

use crate::error::{Error, Result};
use crate::models::{StaffContext, StaffRole};

/// Actions a staff member can attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffAction {
    // Rooms
    ViewRooms,
    ManageRooms,
    DeleteRooms,
    UpdateRoomStatus,

    // Guests
    ViewGuests,
    ManageGuests,
    DeleteGuests,

    // Reservations
    ViewReservations,
    ManageReservations,
    DeleteReservations,

    // Payments
    ViewPayments,
    ManagePayments,
    RefundPayments,

    // Back office
    ViewDashboard,
    RegisterStaff,
}

impl StaffAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffAction::ViewRooms => "view rooms",
            StaffAction::ManageRooms => "manage rooms",
            StaffAction::DeleteRooms => "delete rooms",
            StaffAction::UpdateRoomStatus => "update room status",
            StaffAction::ViewGuests => "view guests",
            StaffAction::ManageGuests => "manage guests",
            StaffAction::DeleteGuests => "delete guests",
            StaffAction::ViewReservations => "view reservations",
            StaffAction::ManageReservations => "manage reservations",
            StaffAction::DeleteReservations => "delete reservations",
            StaffAction::ViewPayments => "view payments",
            StaffAction::ManagePayments => "manage payments",
            StaffAction::RefundPayments => "refund payments",
            StaffAction::ViewDashboard => "view dashboard",
            StaffAction::RegisterStaff => "register staff",
        }
    }
}

/// Permission matrix for staff roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: StaffRole, action: StaffAction) -> bool {
        use StaffRole::*;

        if role == Admin {
            return true;
        }

        match action {
            // Everyone on staff sees the house
            StaffAction::ViewRooms | StaffAction::ViewDashboard => true,

            StaffAction::ManageRooms => role == Manager,
            StaffAction::DeleteRooms => role == Manager,
            StaffAction::UpdateRoomStatus => {
                matches!(role, Manager | Receptionist | Housekeeping | Maintenance)
            }

            // Front desk
            StaffAction::ViewGuests | StaffAction::ViewReservations => {
                matches!(role, Manager | Receptionist | Accounting)
            }
            StaffAction::ManageGuests | StaffAction::ManageReservations => {
                matches!(role, Manager | Receptionist)
            }
            StaffAction::DeleteGuests | StaffAction::DeleteReservations => role == Manager,

            // Money
            StaffAction::ViewPayments => matches!(role, Manager | Receptionist | Accounting),
            StaffAction::ManagePayments => matches!(role, Manager | Receptionist | Accounting),
            StaffAction::RefundPayments => matches!(role, Manager | Accounting),

            StaffAction::RegisterStaff => false,
        }
    }

    /// Fails with `PermissionDenied` unless the caller's role allows `action`
    pub fn require(ctx: &StaffContext, action: StaffAction) -> Result<()> {
        if Self::can_perform(ctx.role, action) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "{} may not {}",
                ctx.role.as_str(),
                action.as_str()
            )))
        }
    }
}
