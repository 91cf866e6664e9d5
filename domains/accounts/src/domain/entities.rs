//! Domain entities for the accounts domain.
//!
//! Each entity mirrors one of the collections named in §3: `User`,
//! `Skylink`, the four append-only usage events, `ApiKey`, `Challenge`,
//! and `Configuration`. Validation lives on the entity the way the
//! teacher's `domains/teams` entities validate themselves, rather than
//! scattered across handlers.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use meridian_auth::Tier;
use meridian_common::{Error, Result};

/// Maximum number of API keys a single user can hold, per §3 (default —
/// the actual ceiling is configurable via `Config::max_api_keys_per_user`).
pub const DEFAULT_MAX_API_KEYS_PER_USER: u32 = 1000;

/// Identity record, per §3 "User". Full account state — the credential
/// resolver only needs [`meridian_auth::ResolvedUser`]'s narrower
/// projection, hydrated by a plain `SELECT` of this table's columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub sub: String,
    pub email: Option<String>,
    pub tier: Tier,
    pub quota_exceeded: bool,
    pub subscription_status: Option<String>,
    pub subscribed_until: Option<DateTime<Utc>>,
    pub subscription_cancel_at: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub payment_customer_id: Option<String>,
    pub email_confirmation_token: Option<String>,
    pub email_confirmation_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Effective tier for limit derivation — demoted to anonymous while
    /// over quota, per §3's invariant `quotaExceeded ⇒ effectiveTier =
    /// anonymous`. Mirrors `ResolvedUser::effective_tier`.
    pub fn effective_tier(&self) -> Tier {
        if self.quota_exceeded {
            Tier::Anonymous
        } else {
            self.tier
        }
    }

    /// Validate invariants per §3.
    pub fn validate(&self) -> Result<()> {
        if self.sub.is_empty() {
            return Err(Error::BadRequest("sub must not be empty".to_string()));
        }
        if let Some(ref email) = self.email {
            if !email.contains('@') {
                return Err(Error::BadRequest("invalid email format".to_string()));
            }
        }
        Ok(())
    }
}

/// Content fingerprint plus cached filename/length, per §3 "Skylink".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Skylink {
    pub id: Uuid,
    pub fingerprint: String,
    pub filename: Option<String>,
    /// `0` means "unknown, fetch pending" per §3.
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

/// Minimum and maximum lengths this portal's fingerprints are validated
/// against — base64url-encoded 256-bit hashes.
const FINGERPRINT_MIN_LEN: usize = 46;
const FINGERPRINT_MAX_LEN: usize = 55;

impl Skylink {
    /// A fingerprint is canonical when its length and charset match the
    /// storage backend's hash encoding (§3: "length and charset
    /// validated").
    pub fn is_valid_fingerprint(fingerprint: &str) -> bool {
        (FINGERPRINT_MIN_LEN..=FINGERPRINT_MAX_LEN).contains(&fingerprint.len())
            && fingerprint
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    pub fn size_known(&self) -> bool {
        self.size > 0
    }
}

/// An upload usage event, per §3. `unpinned_at`, when set, means the
/// upload no longer contributes to storage but still contributes to
/// historical bandwidth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Upload {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub skylink_id: Uuid,
    pub client_ip: Option<String>,
    pub unpinned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Upload {
    pub fn is_active(&self) -> bool {
        self.unpinned_at.is_none()
    }
}

/// A download usage event, per §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Download {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub skylink_id: Uuid,
    pub client_ip: Option<String>,
    pub bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// A registry-read usage event, per §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegistryRead {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A registry-write usage event, per §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegistryWrite {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Opaque high-entropy token for machine access, per §3 "API key".
/// Private keys carry no skylink list; public keys authorize only GETs
/// whose target embeds a covered fingerprint (enforced by
/// `meridian_auth::AuthBackend::resolve`).
#[derive(Clone, PartialEq, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub public: bool,
    pub key_hash: String,
    pub covered_skylinks: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("name", &self.name)
            .field("public", &self.public)
            .field("key_hash", &"[REDACTED]")
            .field("covered_skylinks", &self.covered_skylinks)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl ApiKey {
    const KEY_PREFIX: &'static str = "sk_live_";

    /// Create a new API key. Returns `(ApiKey, raw_key)` — the raw key is
    /// only ever available at creation time, per §3's "constant-time
    /// comparable" invariant (only the hash is persisted).
    pub fn new(
        user_id: Uuid,
        name: Option<String>,
        public: bool,
        covered_skylinks: Vec<String>,
    ) -> Result<(Self, String)> {
        if !public && !covered_skylinks.is_empty() {
            return Err(Error::BadRequest(
                "private keys carry no skylink list".to_string(),
            ));
        }
        let name = name.unwrap_or_else(|| "Default".to_string());
        if name.is_empty() || name.len() > 100 {
            return Err(Error::BadRequest(
                "key name must be 1-100 characters".to_string(),
            ));
        }

        let raw_key = format!(
            "{}{}",
            Self::KEY_PREFIX,
            Uuid::new_v4().to_string().replace('-', "")
        );
        let key_hash = meridian_common::crypto::hash_key(&raw_key);

        let api_key = ApiKey {
            id: Uuid::new_v4(),
            user_id,
            name,
            public,
            key_hash,
            covered_skylinks: Json(covered_skylinks),
            created_at: Utc::now(),
        };

        Ok((api_key, raw_key))
    }

    pub fn verify_key(&self, candidate: &str) -> bool {
        meridian_common::crypto::verify_key_hash(candidate, &self.key_hash)
    }
}

/// A public-key binding accepted via the challenge service (§4.8),
/// allowing key-based register/login independent of the opaque API keys
/// above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicKeyBinding {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

/// A challenge intent, per §4.8. Persisted as plain `TEXT` (no database
/// enum type) and converted at the repository boundary via `Display`/
/// `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeIntent {
    Register,
    Login,
    Update,
}

impl std::fmt::Display for ChallengeIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeIntent::Register => write!(f, "register"),
            ChallengeIntent::Login => write!(f, "login"),
            ChallengeIntent::Update => write!(f, "update"),
        }
    }
}

impl std::str::FromStr for ChallengeIntent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "register" => Ok(ChallengeIntent::Register),
            "login" => Ok(ChallengeIntent::Login),
            "update" => Ok(ChallengeIntent::Update),
            other => Err(Error::BadRequest(format!("invalid challenge intent: {other}"))),
        }
    }
}

/// Server-issued random bytes proving possession of a private key, per
/// §3/§4.8 "Challenge". Built by hand from its row by the repository layer
/// (not `sqlx::FromRow`) since `intent` is stored as plain text rather
/// than a database enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub public_key: String,
    pub intent: ChallengeIntent,
    /// Random challenge bytes, hex-encoded.
    pub nonce: String,
    pub created_at: DateTime<Utc>,
}

/// Challenge TTL, per §4.8 "expires after a fixed TTL".
pub const CHALLENGE_TTL_SECS: i64 = 300;

impl Challenge {
    pub fn new(public_key: String, intent: ChallengeIntent) -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        Self {
            id: Uuid::new_v4(),
            public_key,
            intent,
            nonce: hex::encode(bytes),
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.created_at + chrono::Duration::seconds(CHALLENGE_TTL_SECS)
    }

    /// The response a correctly-behaving client must sign: `nonce ||
    /// intent || recipient`, per §4.8.
    pub fn expected_response(&self, recipient: &str) -> String {
        format!("{}{}{}", self.nonce, self.intent, recipient)
    }
}

/// Key-value table for runtime toggles, per §3 "Configuration".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConfigurationEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}
