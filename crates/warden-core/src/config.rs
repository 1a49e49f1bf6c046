//! Warden configuration (`warden.toml`).
//!
//! Every magnitude the engine uses (cooldown, blocking windows, penalty and
//! reward sizes, quorum rule, shared namespaces) lives here rather than in
//! code. All sections are optional; missing fields take the defaults below.
//!
//! ```toml
//! [classifier]
//! cooldown_secs = 60
//!
//! [blocking]
//! privilege_escalation = 21600
//!
//! [incentives.base_penalty]
//! tampering_with_data = 50
//!
//! [quorum]
//! rule = "majority"
//! ```

use std::path::{Path, PathBuf};

use chrono::Duration;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warden_policy::Role;

use crate::classifier::MisbehaviorKind;

/// Largest supported `token_decimals`. Keeps penalty arithmetic inside u128.
pub const MAX_TOKEN_DECIMALS: u32 = 24;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub incentives: IncentiveConfig,

    #[serde(default)]
    pub quorum: QuorumConfig,

    #[serde(default)]
    pub scopes: ScopeConfig,
}

impl WardenConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        Ok(config)
    }

    /// Load a config file, falling back to defaults if it is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "ignoring config: {}", e);
            Self::default()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.blocking.validate()?;
        self.incentives.validate()?;
        self.scopes.validate()?;
        Ok(())
    }
}

/// `[classifier]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Allowed accesses closer together than this are TooFrequentAccess.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl ClassifierConfig {
    pub fn cooldown(&self) -> Duration {
        secs(self.cooldown_secs)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_cooldown_secs() -> u64 {
    60
}

/// `[blocking]`: how long each kind of misbehavior blocks the principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingConfig {
    #[serde(default = "default_too_frequent_window")]
    pub too_frequent_access: u64,
    #[serde(default = "default_unauthorized_window")]
    pub unauthorized_access: u64,
    #[serde(default = "default_tampering_window")]
    pub tampering_with_data: u64,
    #[serde(default = "default_dos_window")]
    pub denial_of_service: u64,
    #[serde(default = "default_privilege_escalation_window")]
    pub privilege_escalation: u64,
}

impl BlockingConfig {
    pub fn window_secs(&self, kind: MisbehaviorKind) -> u64 {
        match kind {
            MisbehaviorKind::TooFrequentAccess => self.too_frequent_access,
            MisbehaviorKind::UnauthorizedAccess => self.unauthorized_access,
            MisbehaviorKind::TamperingWithData => self.tampering_with_data,
            MisbehaviorKind::DenialOfService => self.denial_of_service,
            MisbehaviorKind::PrivilegeEscalation => self.privilege_escalation,
        }
    }

    pub fn window(&self, kind: MisbehaviorKind) -> Duration {
        secs(self.window_secs(kind))
    }

    /// Windows must be positive and must not shrink as severity grows.
    fn validate(&self) -> Result<(), ConfigError> {
        for kind in MisbehaviorKind::ALL {
            if self.window_secs(kind) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "blocking window for '{}' must be > 0",
                    kind
                )));
            }
        }
        for lower in MisbehaviorKind::ALL {
            for higher in MisbehaviorKind::ALL {
                if higher.severity() > lower.severity()
                    && self.window_secs(higher) < self.window_secs(lower)
                {
                    return Err(ConfigError::Invalid(format!(
                        "blocking window for '{}' ({}s) is shorter than for '{}' ({}s)",
                        higher,
                        self.window_secs(higher),
                        lower,
                        self.window_secs(lower)
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            too_frequent_access: default_too_frequent_window(),
            unauthorized_access: default_unauthorized_window(),
            tampering_with_data: default_tampering_window(),
            denial_of_service: default_dos_window(),
            privilege_escalation: default_privilege_escalation_window(),
        }
    }
}

fn default_too_frequent_window() -> u64 {
    30 * 60
}

fn default_unauthorized_window() -> u64 {
    60 * 60
}

fn default_tampering_window() -> u64 {
    3 * 60 * 60
}

fn default_dos_window() -> u64 {
    6 * 60 * 60
}

fn default_privilege_escalation_window() -> u64 {
    6 * 60 * 60
}

/// `[incentives]`: penalty, reward and allocation sizes in whole tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncentiveConfig {
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,

    #[serde(default)]
    pub base_penalty: PenaltyTable,

    #[serde(default = "default_base_reward")]
    pub base_reward: u64,

    /// Length of an uninterrupted benign streak that earns one reward.
    #[serde(default = "default_reward_threshold_secs")]
    pub benign_reward_threshold_secs: u64,

    #[serde(default = "default_role_weights")]
    pub role_weights: RoleTable,

    #[serde(default = "default_initial_allocation")]
    pub initial_allocation: RoleTable,
}

impl IncentiveConfig {
    /// Base units per whole token.
    pub fn unit(&self) -> u128 {
        10u128.pow(self.token_decimals.min(MAX_TOKEN_DECIMALS))
    }

    pub fn reward_threshold(&self) -> Duration {
        secs(self.benign_reward_threshold_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "token_decimals must be <= {}",
                MAX_TOKEN_DECIMALS
            )));
        }
        for kind in MisbehaviorKind::ALL {
            if self.base_penalty.get(kind) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "base penalty for '{}' must be > 0",
                    kind
                )));
            }
        }
        for role in [
            Role::Admin,
            Role::PrimaryHead,
            Role::SecondaryHead,
            Role::RegularMember,
        ] {
            if self.role_weights.get(role) == 0 {
                return Err(ConfigError::Invalid(format!(
                    "role weight for '{}' must be > 0",
                    role
                )));
            }
        }
        if self.benign_reward_threshold_secs == 0 {
            return Err(ConfigError::Invalid(
                "benign_reward_threshold_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IncentiveConfig {
    fn default() -> Self {
        Self {
            token_decimals: default_token_decimals(),
            base_penalty: PenaltyTable::default(),
            base_reward: default_base_reward(),
            benign_reward_threshold_secs: default_reward_threshold_secs(),
            role_weights: default_role_weights(),
            initial_allocation: default_initial_allocation(),
        }
    }
}

fn default_token_decimals() -> u32 {
    18
}

fn default_base_reward() -> u64 {
    10
}

fn default_reward_threshold_secs() -> u64 {
    24 * 60 * 60
}

fn default_role_weights() -> RoleTable {
    RoleTable {
        admin: 3,
        primary_head: 3,
        secondary_head: 2,
        regular_member: 1,
    }
}

fn default_initial_allocation() -> RoleTable {
    RoleTable {
        admin: 0,
        primary_head: 1_000_000,
        secondary_head: 500_000,
        regular_member: 100_000,
    }
}

/// Base penalty per misbehavior kind, in whole tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyTable {
    #[serde(default = "default_penalty_minor")]
    pub too_frequent_access: u64,
    #[serde(default = "default_penalty_unauthorized")]
    pub unauthorized_access: u64,
    #[serde(default = "default_penalty_tampering")]
    pub tampering_with_data: u64,
    #[serde(default = "default_penalty_severe")]
    pub denial_of_service: u64,
    #[serde(default = "default_penalty_severe")]
    pub privilege_escalation: u64,
}

impl PenaltyTable {
    pub fn get(&self, kind: MisbehaviorKind) -> u64 {
        match kind {
            MisbehaviorKind::TooFrequentAccess => self.too_frequent_access,
            MisbehaviorKind::UnauthorizedAccess => self.unauthorized_access,
            MisbehaviorKind::TamperingWithData => self.tampering_with_data,
            MisbehaviorKind::DenialOfService => self.denial_of_service,
            MisbehaviorKind::PrivilegeEscalation => self.privilege_escalation,
        }
    }
}

impl Default for PenaltyTable {
    fn default() -> Self {
        Self {
            too_frequent_access: default_penalty_minor(),
            unauthorized_access: default_penalty_unauthorized(),
            tampering_with_data: default_penalty_tampering(),
            denial_of_service: default_penalty_severe(),
            privilege_escalation: default_penalty_severe(),
        }
    }
}

fn default_penalty_minor() -> u64 {
    10
}

fn default_penalty_unauthorized() -> u64 {
    20
}

fn default_penalty_tampering() -> u64 {
    50
}

fn default_penalty_severe() -> u64 {
    100
}

/// One number per registered role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleTable {
    #[serde(default)]
    pub admin: u64,
    #[serde(default)]
    pub primary_head: u64,
    #[serde(default)]
    pub secondary_head: u64,
    #[serde(default)]
    pub regular_member: u64,
}

impl RoleTable {
    /// `Role::None` reads as zero.
    pub fn get(&self, role: Role) -> u64 {
        match role {
            Role::Admin => self.admin,
            Role::PrimaryHead => self.primary_head,
            Role::SecondaryHead => self.secondary_head,
            Role::RegularMember => self.regular_member,
            Role::None => 0,
        }
    }
}

/// How many PrimaryHead approvals a collective request needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumRule {
    /// Every current PrimaryHead.
    #[default]
    Unanimous,
    /// More than half of the current PrimaryHeads.
    Majority,
}

/// `[quorum]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuorumConfig {
    #[serde(default)]
    pub rule: QuorumRule,
}

impl QuorumConfig {
    /// Required approvals given the current number of PrimaryHeads. Never 0.
    pub fn required(&self, primary_heads: usize) -> usize {
        let required = match self.rule {
            QuorumRule::Unanimous => primary_heads,
            QuorumRule::Majority => primary_heads / 2 + 1,
        };
        required.max(1)
    }
}

/// `[scopes]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Resource kinds (glob patterns) that any two principals may share a
    /// pairwise scope over, regardless of group.
    #[serde(default = "default_shared_namespaces")]
    pub shared_namespaces: Vec<String>,
}

impl ScopeConfig {
    /// Invalid patterns never match.
    pub fn is_shared(&self, resource_kind: &str) -> bool {
        self.shared_namespaces.iter().any(|p| {
            Pattern::new(p)
                .map(|pattern| pattern.matches(resource_kind))
                .unwrap_or(false)
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for p in &self.shared_namespaces {
            Pattern::new(p).map_err(|e| {
                ConfigError::Invalid(format!("bad shared namespace pattern '{}': {}", p, e))
            })?;
        }
        Ok(())
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            shared_namespaces: default_shared_namespaces(),
        }
    }
}

fn default_shared_namespaces() -> Vec<String> {
    vec![
        crate::GLOBAL_RESOURCE_TABLE.to_string(),
        crate::LOCAL_RESOURCE_TABLE.to_string(),
    ]
}

// chrono panics past i64::MAX / 1000 seconds.
fn secs(value: u64) -> Duration {
    let capped = i64::try_from(value).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    Duration::seconds(capped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WardenConfig::default();
        config.validate().unwrap();
        assert_eq!(config.classifier.cooldown_secs, 60);
        assert_eq!(config.incentives.unit(), 10u128.pow(18));
        assert_eq!(config.quorum.rule, QuorumRule::Unanimous);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = WardenConfig::from_toml("").unwrap();
        assert_eq!(config, WardenConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = WardenConfig::from_toml(
            r#"
[blocking]
privilege_escalation = 86400

[incentives.base_penalty]
tampering_with_data = 75

[quorum]
rule = "majority"
"#,
        )
        .unwrap();
        assert_eq!(config.blocking.privilege_escalation, 86400);
        assert_eq!(config.blocking.denial_of_service, 21600);
        assert_eq!(config.incentives.base_penalty.tampering_with_data, 75);
        assert_eq!(config.incentives.base_penalty.denial_of_service, 100);
        assert_eq!(config.quorum.rule, QuorumRule::Majority);
    }

    #[test]
    fn windows_must_grow_with_severity() {
        let err = WardenConfig::from_toml(
            r#"
[blocking]
tampering_with_data = 60
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Tampering with data"));
    }

    #[test]
    fn zero_penalty_rejected() {
        let result = WardenConfig::from_toml(
            r#"
[incentives.base_penalty]
too_frequent_access = 0
"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_window_rejected() {
        let mut config = WardenConfig::default();
        config.blocking.too_frequent_access = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn quorum_rules() {
        let unanimous = QuorumConfig::default();
        assert_eq!(unanimous.required(5), 5);
        assert_eq!(unanimous.required(0), 1);

        let majority = QuorumConfig {
            rule: QuorumRule::Majority,
        };
        assert_eq!(majority.required(5), 3);
        assert_eq!(majority.required(4), 3);
        assert_eq!(majority.required(1), 1);
    }

    #[test]
    fn shared_namespace_globs() {
        let scopes = ScopeConfig {
            shared_namespaces: vec!["Global*".to_string(), "[".to_string()],
        };
        assert!(scopes.is_shared("GlobalResourceTable"));
        assert!(!scopes.is_shared("photos"));
        assert!(scopes.validate().is_err());
        assert!(ScopeConfig::default().is_shared("LocalResourceTable"));
    }

    #[test]
    fn load_or_default_handles_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert_eq!(WardenConfig::load_or_default(&missing), WardenConfig::default());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[classifier\ncooldown_secs = ").unwrap();
        assert_eq!(WardenConfig::load_or_default(&broken), WardenConfig::default());

        let good = dir.path().join("warden.toml");
        std::fs::write(&good, "[classifier]\ncooldown_secs = 5\n").unwrap();
        assert_eq!(WardenConfig::load(&good).unwrap().classifier.cooldown_secs, 5);
    }

    #[test]
    fn toml_render_roundtrip() {
        let rendered = WardenConfig::default().to_toml().unwrap();
        assert!(rendered.contains("cooldown_secs = 60"));
        assert_eq!(WardenConfig::from_toml(&rendered).unwrap(), WardenConfig::default());
    }
}
