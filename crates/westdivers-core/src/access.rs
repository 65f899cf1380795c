use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Guest,
    #[default]
    Member,
    Instructor,
    TripManager,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageTrips,
    ManageCourses,
    ManageSystem,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Member => "member",
            Role::Instructor => "instructor",
            Role::TripManager => "trip-manager",
            Role::Admin => "admin",
        }
    }

    pub fn has(self, capability: Capability) -> bool {
        match capability {
            Capability::ManageTrips => matches!(self, Role::TripManager | Role::Admin),
            Capability::ManageCourses => matches!(self, Role::Instructor | Role::Admin),
            Capability::ManageSystem => matches!(self, Role::Admin),
        }
    }

    /// Drafts are visible to anyone who manages trips or the whole system.
    pub fn can_see_drafts(self) -> bool {
        self.has(Capability::ManageTrips) || self.has(Capability::ManageSystem)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "guest" => Ok(Role::Guest),
            "member" => Ok(Role::Member),
            "instructor" => Ok(Role::Instructor),
            "trip-manager" | "tripmanager" => Ok(Role::TripManager),
            "admin" => Ok(Role::Admin),
            other => Err(anyhow!(
                "unknown role: {other} (expected guest, member, instructor, trip-manager or admin)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, Role};

    #[test]
    fn only_trip_and_system_managers_see_drafts() {
        assert!(!Role::Guest.can_see_drafts());
        assert!(!Role::Member.can_see_drafts());
        assert!(!Role::Instructor.can_see_drafts());
        assert!(Role::TripManager.can_see_drafts());
        assert!(Role::Admin.can_see_drafts());
    }

    #[test]
    fn admin_holds_every_capability() {
        for capability in [
            Capability::ManageTrips,
            Capability::ManageCourses,
            Capability::ManageSystem,
        ] {
            assert!(Role::Admin.has(capability));
        }
        assert!(Role::Instructor.has(Capability::ManageCourses));
        assert!(!Role::Instructor.has(Capability::ManageTrips));
    }

    #[test]
    fn parses_role_names() {
        assert_eq!("Trip_Manager".parse::<Role>().expect("role"), Role::TripManager);
        assert_eq!("admin".parse::<Role>().expect("role"), Role::Admin);
        assert!("captain".parse::<Role>().is_err());
    }
}
