use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of place a stock pool row or ledger endpoint refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LocationKind {
    #[sea_orm(string_value = "WAREHOUSE")]
    Warehouse,
    #[sea_orm(string_value = "FLOOR")]
    Floor,
    #[sea_orm(string_value = "USER")]
    User,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationKind::Warehouse => "warehouse",
            LocationKind::Floor => "floor",
            LocationKind::User => "user",
        }
    }
}

/// A typed pointer to a warehouse, floor or user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationRef {
    pub kind: LocationKind,
    pub id: i64,
}

impl LocationRef {
    pub fn warehouse(id: i64) -> Self {
        Self {
            kind: LocationKind::Warehouse,
            id,
        }
    }

    pub fn floor(id: i64) -> Self {
        Self {
            kind: LocationKind::Floor,
            id,
        }
    }

    pub fn user(id: i64) -> Self {
        Self {
            kind: LocationKind::User,
            id,
        }
    }

    /// Rebuilds a reference from the nullable column pair used on ledger rows.
    pub fn from_columns(kind: Option<LocationKind>, id: Option<i64>) -> Option<Self> {
        match (kind, id) {
            (Some(kind), Some(id)) => Some(Self { kind, id }),
            _ => None,
        }
    }
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.id)
    }
}
