//! Performance metrics — pure functions over the equity curve.
//!
//! The equity curve starts with initial capital, followed by the equity of
//! the last snapshot at each distinct timestamp. Several symbols sharing a
//! timestamp therefore contribute one period, not one per symbol.

use serde::{Deserialize, Serialize};

use crate::domain::PortfolioSnapshot;
use crate::ledger::PortfolioLedger;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    /// Negative fraction, e.g. -0.15 for a 15% peak-to-trough loss.
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub annualized_volatility: f64,
    pub fill_count: usize,
    pub rejected_orders: usize,
    pub total_commission: f64,
    pub total_slippage: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    /// Position reductions that realized P&L.
    pub closed_trades: usize,
    /// Fraction of closed trades with positive realized P&L.
    pub win_rate: f64,
    pub profit_factor: f64,
}

impl PerformanceMetrics {
    pub fn compute(
        snapshots: &[PortfolioSnapshot],
        ledger: &PortfolioLedger,
        fill_count: usize,
        rejected_orders: usize,
        periods_per_year: f64,
    ) -> Self {
        let curve = equity_curve(ledger.initial_capital(), snapshots);
        Self {
            total_return: total_return(&curve),
            max_drawdown: max_drawdown(&curve),
            sharpe_ratio: sharpe_ratio(&curve, periods_per_year),
            sortino_ratio: sortino_ratio(&curve, periods_per_year),
            annualized_volatility: annualized_volatility(&curve, periods_per_year),
            fill_count,
            rejected_orders,
            total_commission: ledger.total_commission(),
            total_slippage: ledger.total_slippage(),
            realized_pnl: ledger.realized_pnl(),
            unrealized_pnl: ledger.unrealized_pnl(),
            closed_trades: ledger.closed_pnls().len(),
            win_rate: win_rate(ledger.closed_pnls()),
            profit_factor: profit_factor(ledger.closed_pnls()),
        }
    }
}

/// Initial capital followed by the closing equity of each timestamp.
pub fn equity_curve(initial_capital: f64, snapshots: &[PortfolioSnapshot]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(snapshots.len() + 1);
    curve.push(initial_capital);
    for (i, snapshot) in snapshots.iter().enumerate() {
        let last_at_timestamp = snapshots
            .get(i + 1)
            .map_or(true, |next| next.timestamp != snapshot.timestamp);
        if last_at_timestamp {
            curve.push(snapshot.equity);
        }
    }
    curve
}

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&final_eq)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (final_eq - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction. 0.0 for non-decreasing equity.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Drawdown at every point of the curve (0.0 at new highs).
pub fn drawdown_series(equity_curve: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|&eq| {
            peak = peak.max(eq);
            if peak > 0.0 {
                (eq - peak) / peak
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualized Sharpe ratio (zero risk-free rate).
///
/// Returns 0.0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * periods_per_year.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 when there are no negative returns.
pub fn sortino_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    if downside_sq == 0.0 {
        return 0.0;
    }
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / downside_std * periods_per_year.sqrt()
}

/// Sample standard deviation of period returns, annualized.
pub fn annualized_volatility(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    std_dev(&returns) * periods_per_year.sqrt()
}

/// Fraction of closed trades that made money.
pub fn win_rate(closed_pnls: &[f64]) -> f64 {
    if closed_pnls.is_empty() {
        return 0.0;
    }
    let winners = closed_pnls.iter().filter(|&&pnl| pnl > 0.0).count();
    winners as f64 / closed_pnls.len() as f64
}

/// Gross profits / gross losses over closed trades.
///
/// Capped at 100.0 when there are no losses.
pub fn profit_factor(closed_pnls: &[f64]) -> f64 {
    let gross_profit: f64 = closed_pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = closed_pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive curve points. Non-positive bases yield 0.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
