// 7.0 config.rs: all pool tunables in one place. utilization cap, deposit floor, cooldown,
// position cap, protocol fee. 7.1 PoolTerms is the immutable contract a pool is created with.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::pricing::{CurveParams, DEFAULT_MAX_UTILIZATION};
use crate::types::{AccountId, Amount, AssetId, Bps, Rate, Timestamp};

// fee cut can never take more than half of an accrual batch
pub const MAX_PROTOCOL_FEE_BPS: u32 = 5_000;

// largest custody balance an 18dp Decimal still carries exactly
pub const MAX_TOTAL_ASSETS: Decimal = dec!(1_000_000_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    // hard cap on protection_sold / total_assets
    pub max_utilization: Rate,
    // floor for the first deposit. stops a dust deposit from setting a manipulable share price
    pub min_initial_deposit: Amount,
    // seconds a holder must wait after depositing before withdrawing
    pub withdrawal_cooldown_secs: i64,
    // bounds the per-accrual iteration cost
    pub max_active_positions: usize,
    // cut of each accrual batch owed to the fee sink
    pub protocol_fee_bps: Bps,
    pub fee_sink: AccountId,
    // only this caller may settle after a credit event
    pub settlement_authority: AccountId,
    // ceiling on everything the vault holds for the pool
    pub max_total_assets: Amount,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_utilization: Rate::new(DEFAULT_MAX_UTILIZATION),
            min_initial_deposit: Amount::new(dec!(1000)),
            withdrawal_cooldown_secs: 86_400, // 1 day
            max_active_positions: 100,
            protocol_fee_bps: Bps::new(500), // 5%
            fee_sink: AccountId(0),
            settlement_authority: AccountId(0),
            max_total_assets: Amount::new(MAX_TOTAL_ASSETS),
        }
    }
}

impl PoolConfig {
    // testnet: no cooldown, tiny floor, no fee
    pub fn testnet() -> Self {
        Self {
            min_initial_deposit: Amount::new(dec!(1)),
            withdrawal_cooldown_secs: 0,
            protocol_fee_bps: Bps::new(0),
            ..Self::default()
        }
    }

    // mainnet with a wider safety margin and a tighter iteration bound
    pub fn mainnet_conservative() -> Self {
        Self {
            max_utilization: Rate::new(dec!(0.90)),
            min_initial_deposit: Amount::new(dec!(10000)),
            withdrawal_cooldown_secs: 7 * 86_400,
            max_active_positions: 50,
            protocol_fee_bps: Bps::new(1000),
            ..Self::default()
        }
    }

    pub fn with_authorities(mut self, fee_sink: AccountId, settlement_authority: AccountId) -> Self {
        self.fee_sink = fee_sink;
        self.settlement_authority = settlement_authority;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cap = self.max_utilization.value();
        if cap <= Decimal::ZERO || cap >= Decimal::ONE {
            return Err(ConfigError::InvalidUtilizationCap {
                reason: format!("cap {} must be inside (0, 1)", cap),
            });
        }

        if self.min_initial_deposit.value() < Decimal::ZERO {
            return Err(ConfigError::InvalidDepositFloor {
                reason: "minimum initial deposit cannot be negative".to_string(),
            });
        }

        if self.withdrawal_cooldown_secs < 0 {
            return Err(ConfigError::InvalidCooldown {
                reason: "cooldown cannot be negative".to_string(),
            });
        }

        if self.max_active_positions == 0 {
            return Err(ConfigError::InvalidCapacity {
                reason: "need room for at least one position".to_string(),
            });
        }

        if self.protocol_fee_bps.value() > MAX_PROTOCOL_FEE_BPS {
            return Err(ConfigError::InvalidFee {
                reason: format!(
                    "fee {} bps above maximum {} bps",
                    self.protocol_fee_bps.value(),
                    MAX_PROTOCOL_FEE_BPS
                ),
            });
        }

        let ceiling = self.max_total_assets.value();
        if ceiling <= Decimal::ZERO || ceiling > MAX_TOTAL_ASSETS {
            return Err(ConfigError::InvalidAssetCeiling {
                reason: format!("ceiling {} must be inside (0, {}]", ceiling, MAX_TOTAL_ASSETS),
            });
        }

        Ok(())
    }
}

// 7.1: fixed at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTerms {
    // the debt whose credit event the pool insures
    pub reference_asset: AssetId,
    // the single fungible asset deposits, premiums and payouts are made in
    pub settlement_asset: AssetId,
    // which reporter is consulted for credit events
    pub event_source: AssetId,
    pub maturity: Timestamp,
    pub base_spread: Rate,
    pub slope: Rate,
}

impl PoolTerms {
    pub fn validate(&self, created_at: Timestamp) -> Result<(), ConfigError> {
        if self.reference_asset.is_empty() || self.settlement_asset.is_empty() || self.event_source.is_empty() {
            return Err(ConfigError::InvalidTerms {
                reason: "asset and event source identifiers must be set".to_string(),
            });
        }

        if self.maturity <= created_at {
            return Err(ConfigError::InvalidTerms {
                reason: format!("maturity {} not after creation {}", self.maturity, created_at),
            });
        }

        if self.base_spread.value() < Decimal::ZERO || self.slope.value() < Decimal::ZERO {
            return Err(ConfigError::InvalidTerms {
                reason: "base spread and slope must be non-negative".to_string(),
            });
        }

        Ok(())
    }

    pub fn curve(&self, config: &PoolConfig) -> CurveParams {
        CurveParams::new(self.base_spread, self.slope).with_max_utilization(config.max_utilization)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid utilization cap: {reason}")]
    InvalidUtilizationCap { reason: String },

    #[error("Invalid deposit floor: {reason}")]
    InvalidDepositFloor { reason: String },

    #[error("Invalid cooldown: {reason}")]
    InvalidCooldown { reason: String },

    #[error("Invalid capacity: {reason}")]
    InvalidCapacity { reason: String },

    #[error("Invalid fee: {reason}")]
    InvalidFee { reason: String },

    #[error("Invalid asset ceiling: {reason}")]
    InvalidAssetCeiling { reason: String },

    #[error("Invalid pool terms: {reason}")]
    InvalidTerms { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> PoolConfig {
        match self {
            Environment::Development => PoolConfig::default(),
            Environment::Testnet => PoolConfig::testnet(),
            Environment::Mainnet => PoolConfig::mainnet_conservative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> PoolTerms {
        PoolTerms {
            reference_asset: AssetId::new("ACME-2027-SR"),
            settlement_asset: AssetId::new("USDC"),
            event_source: AssetId::new("isda-dc"),
            maturity: Timestamp::from_secs(1_000),
            base_spread: Rate::new(dec!(0.02)),
            slope: Rate::new(dec!(0.1)),
        }
    }

    #[test]
    fn test_default_config_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.config().validate().is_ok());
        assert!(Environment::Testnet.config().validate().is_ok());
        assert!(Environment::Mainnet.config().validate().is_ok());
        assert_eq!(Environment::Testnet.config().withdrawal_cooldown_secs, 0);
    }

    #[test]
    fn test_fee_above_max_rejected() {
        let mut config = PoolConfig::default();
        config.protocol_fee_bps = Bps::new(MAX_PROTOCOL_FEE_BPS + 1);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFee { .. })));

        config.protocol_fee_bps = Bps::new(MAX_PROTOCOL_FEE_BPS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_utilization_cap_bounds() {
        let mut config = PoolConfig::default();
        config.max_utilization = Rate::ONE;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUtilizationCap { .. })));

        config.max_utilization = Rate::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUtilizationCap { .. })));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = PoolConfig::default();
        config.max_active_positions = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCapacity { .. })));
    }

    #[test]
    fn test_asset_ceiling_bounds() {
        let mut config = PoolConfig::default();
        config.max_total_assets = Amount::new(MAX_TOTAL_ASSETS + Decimal::ONE);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAssetCeiling { .. })));

        config.max_total_assets = Amount::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAssetCeiling { .. })));

        config.max_total_assets = Amount::new(dec!(2_000_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_terms_validation() {
        assert!(terms().validate(Timestamp::from_secs(0)).is_ok());
        assert!(terms().validate(Timestamp::from_secs(1_000)).is_err());

        let mut bad = terms();
        bad.settlement_asset = AssetId::new(" ");
        assert!(matches!(bad.validate(Timestamp::from_secs(0)), Err(ConfigError::InvalidTerms { .. })));

        let mut negative = terms();
        negative.slope = Rate::new(dec!(-0.1));
        assert!(negative.validate(Timestamp::from_secs(0)).is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = PoolConfig::mainnet_conservative();
        let json = serde_json::to_string(&config).unwrap();
        let back: PoolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
