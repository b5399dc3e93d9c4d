use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The closed set of roles a profile can carry. Anything the backend stores
/// that is not one of the known spellings becomes `Unrecognized`, which gets
/// the narrowest visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Worker,
    Staff,
    Sales,
    #[default]
    Unrecognized,
}

impl Role {
    /// Roles a person may pick when registering.
    pub const REGISTERABLE: [Role; 3] = [Role::Worker, Role::Staff, Role::Sales];

    pub fn parse(raw: Option<&str>) -> Role {
        // Registration labels (作業員/事務/営業) were written to profiles in
        // some places, so both spellings map to the same role.
        match raw.map(str::trim) {
            Some("worker") | Some("作業員") => Role::Worker,
            Some("staff") | Some("事務") => Role::Staff,
            Some("sales") | Some("営業") => Role::Sales,
            _ => Role::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Worker => "worker",
            Role::Staff => "staff",
            Role::Sales => "sales",
            Role::Unrecognized => "unrecognized",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Worker => "作業員",
            Role::Staff => "事務",
            Role::Sales => "営業",
            Role::Unrecognized => "不明",
        }
    }

    /// Whether reports of every subject are visible, not just one's own.
    pub fn sees_all_reports(&self) -> bool {
        matches!(self, Role::Staff)
    }

    pub fn manages_wages(&self) -> bool {
        matches!(self, Role::Staff)
    }

    pub fn is_registerable(&self) -> bool {
        Self::REGISTERABLE.contains(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Role::parse(raw.as_deref()))
    }
}
