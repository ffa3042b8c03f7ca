use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;

/// The closed set of sports a campus runs rankings for. Each sport carries
/// its own independent rating per participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    TableTennis,
    TableFootball,
    Darts,
    Billiards,
}

impl Sport {
    pub const ALL: [Sport; 4] = [
        Sport::TableTennis,
        Sport::TableFootball,
        Sport::Darts,
        Sport::Billiards,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableTennis => "table_tennis",
            Self::TableFootball => "table_football",
            Self::Darts => "darts",
            Self::Billiards => "billiards",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table_tennis" => Ok(Self::TableTennis),
            "table_football" => Ok(Self::TableFootball),
            "darts" => Ok(Self::Darts),
            "billiards" => Ok(Self::Billiards),
            other => Err(CoreError::Validation(format!("unknown sport '{other}'"))),
        }
    }
}
