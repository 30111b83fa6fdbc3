//! Credit Protection Pool Simulation.
//!
//! Walks a single pool through its lifecycle: pricing against utilization,
//! LP yield from accrued premium, credit event settlement, and the
//! undercollateralization guard.

use protection_core::*;
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

const LP_A: AccountId = AccountId(1);
const LP_B: AccountId = AccountId(2);
const BUYER: AccountId = AccountId(10);
const AUTHORITY: AccountId = AccountId(900);
const FEE_SINK: AccountId = AccountId(901);
const VAULT: AccountId = AccountId(1000);
const START: i64 = 1_767_225_600; // 2026-01-01

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("Credit Protection Pool Simulation");
    println!("Single Pool, Single Settlement Asset, Full Lifecycle\n");

    scenario_a_pricing();
    scenario_b_lp_yield();
    scenario_c_credit_event();
    scenario_d_withdrawal_guard();

    println!("\nAll simulations completed successfully.");
}

fn new_pool() -> Pool<TokenLedger, MockCreditFeed> {
    let mut usdc = TokenLedger::new(AssetId::new("USDC"), VAULT);
    for account in [LP_A, LP_B, BUYER] {
        usdc.mint(account, Amount::new(dec!(10_000_000)));
    }

    let terms = PoolTerms {
        reference_asset: AssetId::new("ACME-2027-SR"),
        settlement_asset: AssetId::new("USDC"),
        event_source: AssetId::new("isda-dc"),
        maturity: Timestamp::from_secs(START + SECONDS_PER_YEAR),
        base_spread: Rate::new(dec!(0.02)),
        slope: Rate::new(dec!(0.10)),
    };

    Pool::new(
        terms,
        PoolConfig::default().with_authorities(FEE_SINK, AUTHORITY),
        EngineConfig::default(),
        usdc,
        MockCreditFeed::new(AssetId::new("isda-dc")),
        Timestamp::from_secs(START),
    )
    .unwrap()
}

/// Premium rises with utilization.
fn scenario_a_pricing() {
    println!("Scenario A: Utilization Pricing\n");

    let mut pool = new_pool();
    pool.deposit(LP_A, Amount::new(dec!(1_000_000))).unwrap();
    println!("  LP deposits $1,000,000");

    let notional = Amount::new(dec!(100_000));
    let quote = pool.quote_protection(notional).unwrap();
    let floor = pricing::base_rate_premium(notional, pool.terms().base_spread, quote.tenor_secs).unwrap();
    println!("  Quote for $100,000 over 1y: ${} (base-rate floor ${})", quote.premium.round(Rounding::Up), floor);

    let bought = pool.buy_protection(BUYER, notional, quote.premium).unwrap();
    println!(
        "  Bought {}: locked spread {:.4}%, utilization {}",
        bought.position_id,
        bought.locked_spread.value() * dec!(100),
        bought.utilization_after
    );

    let next = pool.quote_protection(notional).unwrap();
    println!("  Next quote for $100,000: ${}", next.premium);
    println!("  Current spread: {:.4}%\n", pool.current_spread().unwrap().value() * dec!(100));
}

/// Two LPs share premium income in proportion to their deposits.
fn scenario_b_lp_yield() {
    println!("Scenario B: LP Yield\n");

    let mut pool = new_pool();
    pool.deposit(LP_A, Amount::new(dec!(750_000))).unwrap();
    pool.deposit(LP_B, Amount::new(dec!(250_000))).unwrap();
    println!("  LP A deposits $750,000, LP B deposits $250,000");

    pool.buy_protection(BUYER, Amount::new(dec!(400_000)), Amount::new(dec!(100_000)))
        .unwrap();
    println!("  Buyer takes $400,000 of protection to maturity");

    pool.advance_time(SECONDS_PER_YEAR / 2);
    let accrual = pool.accrue_all_premiums().unwrap();
    println!("  Six months: accrued ${} gross, ${} to LPs, ${} fee", accrual.gross, accrual.net, accrual.protocol_fee);

    let maturity = pool.terms().maturity;
    pool.set_time(maturity);
    let expiry = pool.expire().unwrap();
    println!("  Expired: {} position lapsed, residual ${}", expiry.positions_lapsed, expiry.residual_premium);

    let shares_a = pool.shares_of(LP_A);
    let shares_b = pool.shares_of(LP_B);
    let out_a = pool.withdraw(LP_A, shares_a).unwrap().amount_out;
    let out_b = pool.withdraw(LP_B, shares_b).unwrap().amount_out;

    let profit_a = out_a.value() - dec!(750_000);
    let profit_b = out_b.value() - dec!(250_000);
    println!("  LP A profit ${}, LP B profit ${}", profit_a.round_dp(6), profit_b.round_dp(6));
    println!("  Ratio: {:.4}", profit_a / profit_b);

    let fees = pool.collect_fees().unwrap();
    println!("  Fee sink collects ${}\n", fees);
}

/// Credit event, settlement and the pull claim.
fn scenario_c_credit_event() {
    println!("Scenario C: Credit Event Settlement\n");

    let mut pool = new_pool();
    pool.deposit(LP_A, Amount::new(dec!(1_000_000))).unwrap();
    pool.buy_protection(BUYER, Amount::new(dec!(500_000)), Amount::new(dec!(500_000)))
        .unwrap();
    println!("  $1,000,000 deposited, $500,000 protection bought");

    pool.advance_time(30 * 86_400);
    let reference = pool.terms().reference_asset.clone();
    let now = pool.time();
    pool.event_source_mut().report(reference, CreditEventKind::FailureToPay, now);
    pool.trigger_credit_event().unwrap();

    let share_value_before = pool.convert_to_assets(Shares::new(dec!(1))).unwrap();
    println!("  Credit event reported and triggered, status: {}", pool.pool_status());

    let recovery = Rate::from_wad(500_000_000_000_000_000).unwrap();
    let result = pool.settle(AUTHORITY, recovery).unwrap();
    println!("  Settled at {} recovery: payout ${}, pro rata: {}", recovery, result.total_payout, result.pro_rata);

    let claimed = pool.claim_settlement(BUYER).unwrap();
    let share_value_after = pool.convert_to_assets(Shares::new(dec!(1))).unwrap();
    println!("  Buyer claims ${}", claimed);
    println!("  Share value ${} -> ${}\n", share_value_before, share_value_after);
}

/// Withdrawals cannot strip the collateral backing open protection.
fn scenario_d_withdrawal_guard() {
    println!("Scenario D: Undercollateralization Guard\n");

    let mut pool = new_pool();
    pool.deposit(LP_A, Amount::new(dec!(1_000_000))).unwrap();
    pool.buy_protection(BUYER, Amount::new(dec!(900_000)), Amount::new(dec!(1_000_000)))
        .unwrap();
    pool.advance_time(86_400);
    println!("  $1,000,000 deposited, $900,000 protection sold");

    let shares = pool.shares_of(LP_A);
    match pool.withdraw(LP_A, shares) {
        Ok(_) => println!("  Full withdrawal unexpectedly succeeded"),
        Err(e) => println!("  Full withdrawal rejected: {}", e),
    }
    println!(
        "  Assets ${}, protection sold ${}, shares unchanged: {}\n",
        pool.total_assets().unwrap().round(Rounding::Down),
        pool.total_protection_sold(),
        pool.shares_of(LP_A) == shares
    );
}
