//! Reconciliation of a budget against its ceiling.
//!
//! Over-budget results are scaled down rather than flagged: the caller always
//! gets a result that respects the ceiling it asked for.

use super::{BudgetResult, BudgetStatus};

/// What reconciliation did to a result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation {
    /// No ceiling supplied; nothing checked.
    Unconstrained,
    /// Total already fit; `headroom` is what is left.
    WithinBudget { headroom: f64 },
    /// Every amount was multiplied by `ratio` (0 for a non-positive ceiling).
    Rescaled { ratio: f64 },
}

/// Bring `result` under `ceiling`, mutating amounts in place.
///
/// Uses `result.total_amount` as the current total. On rescale the total is
/// set to exactly `ceiling`, not to the rescaled sum. A negative ceiling is
/// treated as zero, so amounts never go below zero.
///
/// Only the grand total is enforced. Per-category constraints on the request
/// are not consulted.
pub fn reconcile(result: &mut BudgetResult, ceiling: Option<f64>) -> Reconciliation {
    let Some(ceiling) = ceiling else {
        return Reconciliation::Unconstrained;
    };
    let ceiling = ceiling.max(0.0);
    let total = result.total_amount;

    if total <= ceiling {
        let headroom = ceiling - total;
        result.status = Some(BudgetStatus::WithinBudget);
        result
            .recommendations
            .push(format!("Остаток бюджета: {:.2} руб.", headroom));
        return Reconciliation::WithinBudget { headroom };
    }

    // total > ceiling >= 0 from here on
    let ratio = ceiling / total;
    tracing::info!(
        "Budget total {:.2} exceeds ceiling {:.2}; scaling all items by {:.4}",
        total,
        ceiling,
        ratio
    );
    for item in &mut result.items {
        item.scale(ratio);
    }
    result.total_amount = ceiling;
    result.status = Some(BudgetStatus::WithinBudget);
    result.recommendations.push(format!(
        "Смета пропорционально уменьшена на {:.1}% до лимита {:.2} руб.",
        (1.0 - ratio) * 100.0,
        ceiling
    ));
    Reconciliation::Rescaled { ratio }
}
