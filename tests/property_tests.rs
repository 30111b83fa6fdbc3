//! Property-based tests for the pricer and share math.
//!
//! These tests verify invariants hold under random inputs.

use protection_core::pricing::{base_rate_premium, quote_premium, spread};
use protection_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Strategies for generating test data
fn utilization_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..9_500i64).prop_map(|x| Decimal::new(x, 4)) // 0 to 0.9499
}

fn base_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=1_000i64).prop_map(|x| Decimal::new(x, 4)) // 0% to 10%
}

fn slope_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=5_000i64).prop_map(|x| Decimal::new(x, 4)) // 0 to 0.5
}

fn tenor_strategy() -> impl Strategy<Value = i64> {
    86_400i64..(2 * SECONDS_PER_YEAR)
}

fn curve(base: Decimal, slope: Decimal) -> CurveParams {
    CurveParams::new(Rate::new(base), Rate::new(slope))
}

fn testnet_pool() -> Pool<TokenLedger, MockCreditFeed> {
    let mut usdc = TokenLedger::new(AssetId::new("USDC"), AccountId(1000));
    for account in [AccountId(1), AccountId(2), AccountId(10)] {
        usdc.mint(account, Amount::new(dec!(100_000_000)));
    }
    let terms = PoolTerms {
        reference_asset: AssetId::new("ACME"),
        settlement_asset: AssetId::new("USDC"),
        event_source: AssetId::new("dc"),
        maturity: Timestamp::from_secs(SECONDS_PER_YEAR),
        base_spread: Rate::new(dec!(0.02)),
        slope: Rate::new(dec!(0.10)),
    };
    let config = PoolConfig {
        protocol_fee_bps: Bps::new(500),
        ..PoolConfig::testnet()
    };
    Pool::new(
        terms,
        config,
        EngineConfig::default(),
        usdc,
        MockCreditFeed::new(AssetId::new("dc")),
        Timestamp::from_secs(0),
    )
    .unwrap()
}

proptest! {
    /// Spread never decreases as utilization rises
    #[test]
    fn spread_is_monotonic(
        a in utilization_strategy(),
        b in utilization_strategy(),
        base in base_strategy(),
        slope in slope_strategy(),
    ) {
        let c = curve(base, slope);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let s_lo = spread(Rate::new(lo), &c).unwrap();
        let s_hi = spread(Rate::new(hi), &c).unwrap();
        prop_assert!(s_lo <= s_hi, "spread({}) = {} > spread({}) = {}", lo, s_lo, hi, s_hi);
    }

    /// Spread at zero utilization is exactly the base spread
    #[test]
    fn spread_at_zero_is_base(base in base_strategy(), slope in slope_strategy()) {
        prop_assert_eq!(spread(Rate::ZERO, &curve(base, slope)).unwrap(), Rate::new(base));
    }

    /// Spread never falls below base
    #[test]
    fn spread_at_least_base(u in utilization_strategy(), base in base_strategy(), slope in slope_strategy()) {
        prop_assert!(spread(Rate::new(u), &curve(base, slope)).unwrap() >= Rate::new(base));
    }

    /// Any quote clears the base-rate floor
    #[test]
    fn premium_at_least_base_rate(
        notional in 1i64..400_000,
        existing in 0i64..500_000,
        tenor in tenor_strategy(),
        base in base_strategy(),
        slope in slope_strategy(),
    ) {
        let c = curve(base, slope);
        let quote = quote_premium(
            Amount::from(notional),
            Amount::from(1_000_000),
            Amount::from(existing),
            &c,
            tenor,
        )
        .unwrap();
        let floor = base_rate_premium(Amount::from(notional), Rate::new(base), tenor).unwrap();
        prop_assert!(quote.premium >= floor, "premium {} below floor {}", quote.premium, floor);
    }

    /// More protection outstanding never makes the next purchase cheaper
    #[test]
    fn premium_rises_with_existing_protection(
        notional in 1i64..200_000,
        existing in 0i64..300_000,
        extra in 1i64..200_000,
        tenor in tenor_strategy(),
    ) {
        let c = curve(dec!(0.02), dec!(0.10));
        let liquidity = Amount::from(1_000_000);
        let lighter = quote_premium(Amount::from(notional), liquidity, Amount::from(existing), &c, tenor).unwrap();
        let heavier = quote_premium(Amount::from(notional), liquidity, Amount::from(existing + extra), &c, tenor).unwrap();
        prop_assert!(heavier.premium >= lighter.premium);
    }

    /// Quotes past the cap are always rejected
    #[test]
    fn cap_is_never_exceeded(existing in 0i64..950_000, notional in 1i64..1_000_000) {
        let c = curve(dec!(0.02), dec!(0.10));
        let result = quote_premium(Amount::from(notional), Amount::from(1_000_000), Amount::from(existing), &c, SECONDS_PER_YEAR);
        if existing + notional > 950_000 {
            let is_cap_error = matches!(result, Err(PricingError::UtilizationCapExceeded { .. }));
            prop_assert!(is_cap_error);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// Deposit then immediate withdrawal returns what went in, within rounding
    #[test]
    fn deposit_withdraw_preserves_value(
        seed in 1_000i64..2_000_000,
        sold in 0i64..500_000,
        elapsed in 0i64..(180 * 86_400),
        amount in 1i64..1_000_000,
    ) {
        let mut pool = testnet_pool();
        pool.deposit(AccountId(1), Amount::from(seed)).unwrap();
        if sold > 0 && Decimal::from(sold) <= Decimal::from(seed) * dec!(0.5) {
            pool.buy_protection(AccountId(10), Amount::from(sold), Amount::from(10_000_000)).unwrap();
        }
        pool.advance_time(elapsed);
        pool.accrue_all_premiums().unwrap();

        let deposited = Amount::from(amount);
        let minted = pool.deposit(AccountId(2), deposited).unwrap().shares_minted;
        let out = pool.withdraw(AccountId(2), minted).unwrap().amount_out;

        prop_assert!(out <= deposited, "withdrew {} after depositing {}", out, deposited);
        prop_assert!(deposited.value() - out.value() <= dec!(0.000001));
    }

    /// Shares never round in the depositor's favor
    #[test]
    fn conversion_round_trip_never_gains(
        total_shares in 1i64..10_000_000,
        total_assets in 1i64..20_000_000,
        assets in 1i64..1_000_000,
    ) {
        let mut ledger = ShareLedger::new();
        ledger.mint(AccountId(1), Shares::from(total_shares), Timestamp::from_secs(0)).unwrap();
        let pool_assets = Amount::from(total_assets);

        let shares = ledger.convert_to_shares(Amount::from(assets), pool_assets).unwrap();
        let back = ledger.convert_to_assets(shares, pool_assets).unwrap();
        prop_assert!(back <= Amount::from(assets));
    }
}

#[test]
fn wad_recovery_rate_bridges_exactly() {
    let half = Rate::from_wad(500_000_000_000_000_000).unwrap();
    assert_eq!(half, Rate::new(dec!(0.5)));
    assert_eq!(half.to_wad(), Some(500_000_000_000_000_000));
    assert_eq!(Rate::from_wad(1_000_000_000_000_000_000), Some(Rate::ONE));
}
