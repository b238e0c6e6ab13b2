//! Profit-optimization routines over a historical price series.
//!
//! Pure functions: no shared state, no side effects, no randomness, no clock.
//! Both run in linear time in a single pass and are deterministic for a given
//! input series.

use rust_decimal::Decimal;
use serde::Serialize;

/// Result of [`max_single_trade_profit`]: the best buy/sell index pair, or no
/// window at all when the series never rises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SingleTrade {
    /// `(buy_index, sell_index)` with `buy_index < sell_index`, or `None`
    /// when no positive-profit window exists.
    pub window: Option<(usize, usize)>,
    pub profit: Decimal,
}

/// Result of [`max_total_profit_unlimited_trades`]: total profit and the
/// disjoint windows that produce it, in chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalProfit {
    pub profit: Decimal,
    pub windows: Vec<(usize, usize)>,
}

/// Best single buy-then-sell trade over `prices`.
///
/// Kadane-style scan: track the minimum price seen so far and the best
/// `prices[j] - min_so_far` with the minimum strictly before `j`. A
/// monotonically non-increasing series yields `{ window: None, profit: 0 }`,
/// which is a valid result, not an error.
pub fn max_single_trade_profit(prices: &[Decimal]) -> SingleTrade {
    let mut best = SingleTrade {
        window: None,
        profit: Decimal::ZERO,
    };
    let mut min_idx = 0usize;
    for (j, &price) in prices.iter().enumerate() {
        let gain = price - prices[min_idx];
        if gain > best.profit {
            best = SingleTrade {
                window: Some((min_idx, j)),
                profit: gain,
            };
        }
        if price < prices[min_idx] {
            min_idx = j;
        }
    }
    best
}

/// Maximum total profit with unlimited non-overlapping trades.
///
/// Greedy accumulation of every positive day-over-day delta; the reported
/// windows are the maximal ascending runs, so each one is a single
/// buy-at-the-bottom, sell-at-the-top trade.
pub fn max_total_profit_unlimited_trades(prices: &[Decimal]) -> TotalProfit {
    let mut profit = Decimal::ZERO;
    let mut windows = Vec::new();
    let mut run_start: Option<usize> = None;

    for i in 1..prices.len() {
        if prices[i] > prices[i - 1] {
            if run_start.is_none() {
                run_start = Some(i - 1);
            }
            profit += prices[i] - prices[i - 1];
        } else if let Some(start) = run_start.take() {
            windows.push((start, i - 1));
        }
    }
    if let Some(start) = run_start {
        windows.push((start, prices.len() - 1));
    }

    TotalProfit { profit, windows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|&v| Decimal::from(v)).collect()
    }

    #[test]
    fn test_single_trade_worked_example() {
        // buy at index 1 (price 1), sell at index 4 (price 6)
        let result = max_single_trade_profit(&series(&[7, 1, 5, 3, 6, 4]));
        assert_eq!(result.window, Some((1, 4)));
        assert_eq!(result.profit, dec!(5));
    }

    #[test]
    fn test_unlimited_trades_worked_example() {
        let result = max_total_profit_unlimited_trades(&series(&[7, 1, 5, 3, 6, 4]));
        assert_eq!(result.profit, dec!(7));
        assert_eq!(result.windows, vec![(1, 2), (3, 4)]);
    }

    #[test]
    fn test_non_increasing_series_has_no_window() {
        let result = max_single_trade_profit(&series(&[9, 7, 7, 4, 1]));
        assert_eq!(result.window, None);
        assert_eq!(result.profit, Decimal::ZERO);

        let total = max_total_profit_unlimited_trades(&series(&[9, 7, 7, 4, 1]));
        assert_eq!(total.profit, Decimal::ZERO);
        assert!(total.windows.is_empty());
    }

    #[test]
    fn test_empty_and_single_element_series() {
        assert_eq!(max_single_trade_profit(&[]).window, None);
        assert_eq!(max_single_trade_profit(&series(&[5])).window, None);
        assert!(max_total_profit_unlimited_trades(&[]).windows.is_empty());
        assert!(max_total_profit_unlimited_trades(&series(&[5])).windows.is_empty());
    }

    #[test]
    fn test_monotonically_rising_series_is_one_window() {
        let single = max_single_trade_profit(&series(&[1, 2, 3, 4, 5]));
        assert_eq!(single.window, Some((0, 4)));
        assert_eq!(single.profit, dec!(4));

        let total = max_total_profit_unlimited_trades(&series(&[1, 2, 3, 4, 5]));
        assert_eq!(total.profit, dec!(4));
        assert_eq!(total.windows, vec![(0, 4)]);
    }

    #[test]
    fn test_flat_segments_do_not_open_windows() {
        let total = max_total_profit_unlimited_trades(&series(&[3, 3, 5, 5, 2, 4]));
        assert_eq!(total.profit, dec!(4));
        assert_eq!(total.windows, vec![(1, 2), (4, 5)]);
    }

    #[test]
    fn test_single_trade_prefers_earliest_window_on_tie() {
        // both (0,1) and (2,3) yield 5; the scan keeps the first
        let result = max_single_trade_profit(&series(&[5, 10, 0, 5]));
        assert_eq!(result.window, Some((0, 1)));
        assert_eq!(result.profit, dec!(5));
    }

    #[test]
    fn test_decimal_prices() {
        let prices = vec![dec!(150.25), dec!(149.90), dec!(151.05), dec!(150.00)];
        let result = max_single_trade_profit(&prices);
        assert_eq!(result.window, Some((1, 2)));
        assert_eq!(result.profit, dec!(1.15));
    }
}
