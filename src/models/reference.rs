use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The small admin-managed lookup sets used to populate selection fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Drivers,
    Grades,
    Plants,
}

impl ReferenceKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            ReferenceKind::Drivers => "drivers",
            ReferenceKind::Grades => "grades",
            ReferenceKind::Plants => "plants",
        }
    }

    /// Singular noun used in error messages
    pub fn noun(&self) -> &'static str {
        match self {
            ReferenceKind::Drivers => "driver",
            ReferenceKind::Grades => "grade",
            ReferenceKind::Plants => "plant",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drivers" => Ok(ReferenceKind::Drivers),
            "grades" => Ok(ReferenceKind::Grades),
            "plants" => Ok(ReferenceKind::Plants),
            other => Err(format!("unknown reference set: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReference {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceList {
    pub kind: ReferenceKind,
    pub names: Vec<String>,
}
