//! Shared credential-resolver types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, Postgres, Type};
use uuid::Uuid;

/// Service tier, ordered `anonymous < free < premium-5 < premium-20 <
/// premium-80 < reserved-max`, per §3. Stored as a `SMALLINT` column —
/// a plain Postgres enum type doesn't fit numerically-ordered tiers this
/// cleanly, so the discriminant is the wire representation. The same
/// discriminant is also the JSON representation (`tier=1`, not
/// `tier="Free"`) — every client of this API reads tiers as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum Tier {
    Anonymous = 0,
    Free = 1,
    Premium5 = 2,
    Premium20 = 3,
    Premium80 = 4,
    ReservedMax = 5,
}

impl Tier {
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Tier::Anonymous),
            1 => Some(Tier::Free),
            2 => Some(Tier::Premium5),
            3 => Some(Tier::Premium20),
            4 => Some(Tier::Premium80),
            5 => Some(Tier::ReservedMax),
            _ => None,
        }
    }

    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl TryFrom<i16> for Tier {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Tier::from_i16(value).ok_or_else(|| format!("invalid tier discriminant: {value}"))
    }
}

impl From<Tier> for i16 {
    fn from(tier: Tier) -> i16 {
        tier.as_i16()
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i16())
    }
}

impl Type<Postgres> for Tier {
    fn type_info() -> PgTypeInfo {
        <i16 as Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Tier {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as Decode<Postgres>>::decode(value)?;
        Tier::from_i16(raw).ok_or_else(|| format!("invalid tier discriminant: {raw}").into())
    }
}

impl<'q> Encode<'q, Postgres> for Tier {
    fn encode_by_ref(
        &self,
        buf: &mut PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as Encode<Postgres>>::encode_by_ref(&self.as_i16(), buf)
    }
}

/// The minimal user projection the credential resolver needs — full
/// account state (quota, subscription) lives in the accounts domain.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResolvedUser {
    pub id: Uuid,
    pub sub: String,
    pub email: Option<String>,
    pub tier: Tier,
    pub quota_exceeded: bool,
}

impl ResolvedUser {
    /// Effective tier for limit derivation — demoted to anonymous while
    /// over quota, per §3's invariant `quotaExceeded ⇒ effectiveTier =
    /// anonymous`.
    pub fn effective_tier(&self) -> Tier {
        if self.quota_exceeded {
            Tier::Anonymous
        } else {
            self.tier
        }
    }
}

/// An authenticated API key, excluding its hash.
#[derive(Debug, Clone)]
pub struct ResolvedApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub public: bool,
    pub covered_skylinks: Vec<String>,
    pub created_at: DateTime<Utc>,
}
