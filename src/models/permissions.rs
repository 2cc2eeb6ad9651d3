//! Per-user capability matrix and admin role presets

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Functional area of the application a permission applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Dashboard,
    Employees,
    Assets,
    Mouse,
    Accessories,
    Services,
    Complaints,
    Calendar,
    ToolsManager,
    Admin,
    Rar,
    Settings,
    Alerts,
    Reminders,
    Byod,
    Chat,
}

impl Module {
    pub const ALL: [Module; 16] = [
        Module::Dashboard,
        Module::Employees,
        Module::Assets,
        Module::Mouse,
        Module::Accessories,
        Module::Services,
        Module::Complaints,
        Module::Calendar,
        Module::ToolsManager,
        Module::Admin,
        Module::Rar,
        Module::Settings,
        Module::Alerts,
        Module::Reminders,
        Module::Byod,
        Module::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Employees => "employees",
            Module::Assets => "assets",
            Module::Mouse => "mouse",
            Module::Accessories => "accessories",
            Module::Services => "services",
            Module::Complaints => "complaints",
            Module::Calendar => "calendar",
            Module::ToolsManager => "tools_manager",
            Module::Admin => "admin",
            Module::Rar => "rar",
            Module::Settings => "settings",
            Module::Alerts => "alerts",
            Module::Reminders => "reminders",
            Module::Byod => "byod",
            Module::Chat => "chat",
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Module {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown module: {}", s)))
    }
}

/// Kind of access requested on a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Update,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Update => "update",
        }
    }
}

/// Access flags for a single module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ModuleAccess {
    pub read: bool,
    pub write: bool,
    pub update: bool,
}

impl ModuleAccess {
    pub const NONE: ModuleAccess = ModuleAccess { read: false, write: false, update: false };
    pub const READ_ONLY: ModuleAccess = ModuleAccess { read: true, write: false, update: false };
    pub const FULL: ModuleAccess = ModuleAccess { read: true, write: true, update: true };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.read,
            Action::Write => self.write,
            Action::Update => self.update,
        }
    }

    /// Write or update without read is not a valid grant
    pub fn is_consistent(&self) -> bool {
        self.read || (!self.write && !self.update)
    }
}

/// Fixed-shape permission matrix, one entry per module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PermissionMatrix {
    pub dashboard: ModuleAccess,
    pub employees: ModuleAccess,
    pub assets: ModuleAccess,
    pub mouse: ModuleAccess,
    pub accessories: ModuleAccess,
    pub services: ModuleAccess,
    pub complaints: ModuleAccess,
    pub calendar: ModuleAccess,
    pub tools_manager: ModuleAccess,
    pub admin: ModuleAccess,
    pub rar: ModuleAccess,
    pub settings: ModuleAccess,
    pub alerts: ModuleAccess,
    pub reminders: ModuleAccess,
    pub byod: ModuleAccess,
    pub chat: ModuleAccess,
}

impl PermissionMatrix {
    /// Same access on every module
    pub fn uniform(access: ModuleAccess) -> Self {
        let mut matrix = Self::default();
        for module in Module::ALL {
            *matrix.access_mut(module) = access;
        }
        matrix
    }

    /// Matrix given to newly created employees: dashboard read only
    pub fn employee_default() -> Self {
        Self {
            dashboard: ModuleAccess::READ_ONLY,
            ..Self::default()
        }
    }

    pub fn access(&self, module: Module) -> ModuleAccess {
        match module {
            Module::Dashboard => self.dashboard,
            Module::Employees => self.employees,
            Module::Assets => self.assets,
            Module::Mouse => self.mouse,
            Module::Accessories => self.accessories,
            Module::Services => self.services,
            Module::Complaints => self.complaints,
            Module::Calendar => self.calendar,
            Module::ToolsManager => self.tools_manager,
            Module::Admin => self.admin,
            Module::Rar => self.rar,
            Module::Settings => self.settings,
            Module::Alerts => self.alerts,
            Module::Reminders => self.reminders,
            Module::Byod => self.byod,
            Module::Chat => self.chat,
        }
    }

    fn access_mut(&mut self, module: Module) -> &mut ModuleAccess {
        match module {
            Module::Dashboard => &mut self.dashboard,
            Module::Employees => &mut self.employees,
            Module::Assets => &mut self.assets,
            Module::Mouse => &mut self.mouse,
            Module::Accessories => &mut self.accessories,
            Module::Services => &mut self.services,
            Module::Complaints => &mut self.complaints,
            Module::Calendar => &mut self.calendar,
            Module::ToolsManager => &mut self.tools_manager,
            Module::Admin => &mut self.admin,
            Module::Rar => &mut self.rar,
            Module::Settings => &mut self.settings,
            Module::Alerts => &mut self.alerts,
            Module::Reminders => &mut self.reminders,
            Module::Byod => &mut self.byod,
            Module::Chat => &mut self.chat,
        }
    }

    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.access(module).allows(action)
    }

    /// Grant or revoke a single flag.
    ///
    /// Granting write or update also grants read; revoking read also revokes
    /// write and update, so the matrix never holds an inconsistent entry.
    pub fn set(&mut self, module: Module, action: Action, granted: bool) {
        let access = self.access_mut(module);
        match (action, granted) {
            (Action::Read, true) => access.read = true,
            (Action::Read, false) => *access = ModuleAccess::NONE,
            (Action::Write, true) => {
                access.write = true;
                access.read = true;
            }
            (Action::Write, false) => access.write = false,
            (Action::Update, true) => {
                access.update = true;
                access.read = true;
            }
            (Action::Update, false) => access.update = false,
        }
    }

    /// Reject matrices holding write or update without read
    pub fn validate(&self) -> AppResult<()> {
        let invalid: Vec<&str> = Module::ALL
            .iter()
            .filter(|m| !self.access(**m).is_consistent())
            .map(|m| m.as_str())
            .collect();

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "write or update granted without read on: {}",
                invalid.join(", ")
            )))
        }
    }
}

/// Administrative role, used only to seed a new admin's matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminRole {
    SuperAdmin,
    Operator,
    AssetsManager,
    ComplaintAssistant,
}

impl AdminRole {
    /// Permission preset copied into the matrix at creation time
    pub fn preset(&self) -> PermissionMatrix {
        match self {
            AdminRole::SuperAdmin => PermissionMatrix::uniform(ModuleAccess::FULL),
            AdminRole::Operator => PermissionMatrix::uniform(ModuleAccess::READ_ONLY),
            AdminRole::AssetsManager => PermissionMatrix {
                dashboard: ModuleAccess::READ_ONLY,
                assets: ModuleAccess::FULL,
                mouse: ModuleAccess::FULL,
                accessories: ModuleAccess::FULL,
                services: ModuleAccess::FULL,
                rar: ModuleAccess::READ_ONLY,
                ..PermissionMatrix::default()
            },
            AdminRole::ComplaintAssistant => PermissionMatrix {
                dashboard: ModuleAccess::READ_ONLY,
                complaints: ModuleAccess::FULL,
                ..PermissionMatrix::default()
            },
        }
    }
}
