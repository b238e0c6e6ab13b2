//! Brute-force cross-checks of the profit-optimization routines on
//! randomized price series.

use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;

use exchange_engine::optimizer::{max_single_trade_profit, max_total_profit_unlimited_trades};

fn random_series(rng: &mut StdRng, len: usize) -> Vec<Decimal> {
    (0..len)
        .map(|_| Decimal::from(rng.random_range(1..=200u64)))
        .collect()
}

/// O(n^2) reference: try every buy/sell pair.
fn brute_force_single(prices: &[Decimal]) -> Decimal {
    let mut best = Decimal::ZERO;
    for i in 0..prices.len() {
        for j in i + 1..prices.len() {
            best = best.max(prices[j] - prices[i]);
        }
    }
    best
}

/// Exponential reference for unlimited non-overlapping trades: at every day
/// either do nothing, or (if flat) buy, or (if holding) sell.
fn brute_force_unlimited(prices: &[Decimal], day: usize, bought_at: Option<Decimal>) -> Decimal {
    if day == prices.len() {
        return Decimal::ZERO;
    }
    let skip = brute_force_unlimited(prices, day + 1, bought_at);
    match bought_at {
        None => {
            let buy = brute_force_unlimited(prices, day + 1, Some(prices[day]));
            skip.max(buy)
        }
        Some(cost) => {
            let sell =
                prices[day] - cost + brute_force_unlimited(prices, day + 1, None);
            skip.max(sell)
        }
    }
}

#[test]
fn single_trade_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let len = rng.random_range(0..=40usize);
        let prices = random_series(&mut rng, len);

        let fast = max_single_trade_profit(&prices);
        let slow = brute_force_single(&prices);
        assert_eq!(fast.profit, slow, "series: {prices:?}");

        match fast.window {
            Some((buy, sell)) => {
                assert!(buy < sell);
                assert_eq!(prices[sell] - prices[buy], fast.profit);
                assert!(fast.profit > Decimal::ZERO);
            }
            None => assert_eq!(fast.profit, Decimal::ZERO),
        }
    }
}

#[test]
fn unlimited_trades_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let len = rng.random_range(0..=12usize);
        let prices = random_series(&mut rng, len);

        let fast = max_total_profit_unlimited_trades(&prices);
        let slow = brute_force_unlimited(&prices, 0, None);
        assert_eq!(fast.profit, slow, "series: {prices:?}");
    }
}

#[test]
fn unlimited_trade_windows_are_disjoint_and_account_for_profit() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..100 {
        let len = rng.random_range(2..=40usize);
        let prices = random_series(&mut rng, len);
        let result = max_total_profit_unlimited_trades(&prices);

        let mut last_end = None;
        let mut window_profit = Decimal::ZERO;
        for &(buy, sell) in &result.windows {
            assert!(buy < sell, "degenerate window in {prices:?}");
            if let Some(end) = last_end {
                assert!(buy >= end, "overlapping windows in {prices:?}");
            }
            last_end = Some(sell);
            window_profit += prices[sell] - prices[buy];
            assert!(prices[sell] > prices[buy]);
        }
        assert_eq!(window_profit, result.profit);
    }
}

#[test]
fn single_trade_never_beats_unlimited() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..100 {
        let len = rng.random_range(0..=40usize);
        let prices = random_series(&mut rng, len);
        let single = max_single_trade_profit(&prices);
        let unlimited = max_total_profit_unlimited_trades(&prices);
        assert!(unlimited.profit >= single.profit);
    }
}
