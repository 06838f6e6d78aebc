//! Document-backed REST resources.
//!
//! Every resource is a [`Collection`] served by the generic handlers in
//! [`crud`]. Per-collection behavior (required fields, user password
//! handling, realtime fan-out) hangs off the enum.

pub mod crud;
pub mod notify;
pub mod users;

/// A named document collection with its own REST surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Events,
    Users,
    Departments,
    ResourceAvailability,
    LocationAvailability,
    Messages,
    Notifications,
    LoginLogs,
    UserActivityLogs,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Events,
        Collection::Users,
        Collection::Departments,
        Collection::ResourceAvailability,
        Collection::LocationAvailability,
        Collection::Messages,
        Collection::Notifications,
        Collection::LoginLogs,
        Collection::UserActivityLogs,
    ];

    /// Storage name, also used as `resource` in activity logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Users => "users",
            Self::Departments => "departments",
            Self::ResourceAvailability => "resource_availability",
            Self::LocationAvailability => "location_availability",
            Self::Messages => "messages",
            Self::Notifications => "notifications",
            Self::LoginLogs => "login_logs",
            Self::UserActivityLogs => "user_activity_logs",
        }
    }

    /// Route prefix under which the collection is served.
    pub fn path(self) -> &'static str {
        match self {
            Self::Events => "/api/events",
            Self::Users => "/api/users",
            Self::Departments => "/api/departments",
            Self::ResourceAvailability => "/api/resource-availability",
            Self::LocationAvailability => "/api/location-availability",
            Self::Messages => "/api/messages",
            Self::Notifications => "/api/notifications",
            Self::LoginLogs => "/api/login-logs",
            Self::UserActivityLogs => "/api/user-activity-logs",
        }
    }

    /// Fields that must be present and non-empty, on create and after each update.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Events => &["title"],
            Self::Users => &["name", "email", "password"],
            Self::Departments => &["name"],
            Self::ResourceAvailability => &["resource"],
            Self::LocationAvailability => &["location"],
            Self::Messages => &["content"],
            Self::Notifications => &["userId", "message"],
            Self::LoginLogs | Self::UserActivityLogs => &[],
        }
    }

    /// Singular label used in messages ("Event not found").
    pub fn label(self) -> &'static str {
        match self {
            Self::Events => "Event",
            Self::Users => "User",
            Self::Departments => "Department",
            Self::ResourceAvailability => "Resource availability",
            Self::LocationAvailability => "Location availability",
            Self::Messages => "Message",
            Self::Notifications => "Notification",
            Self::LoginLogs => "Login log",
            Self::UserActivityLogs => "User activity log",
        }
    }

    /// Audit collections do not generate activity entries about themselves.
    pub fn is_audit_log(self) -> bool {
        matches!(self, Self::LoginLogs | Self::UserActivityLogs)
    }
}

/// Kind of mutation, shared by activity logs and realtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "create",
            Self::Updated => "update",
            Self::Deleted => "delete",
        }
    }
}
