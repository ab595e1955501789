use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use salonbook_core::{DomainResult, Money};

use crate::transaction::{FinanceTransaction, TransactionKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub kind: TransactionKind,
    pub category: String,
    pub total: Money,
    pub count: u64,
}

/// Totals for an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinanceSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub income: Money,
    pub expense: Money,
    /// `income - expense`; negative when the period ran at a loss.
    pub net: i64,
    pub by_category: Vec<CategoryTotal>,
}

/// Summarize `transactions` whose `occurred_on` lies in `[from, to]`.
/// Open bounds include everything on that side.
pub fn summarize<'a>(
    transactions: impl IntoIterator<Item = &'a FinanceTransaction>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> DomainResult<FinanceSummary> {
    let mut income = Money::ZERO;
    let mut expense = Money::ZERO;
    let mut buckets: BTreeMap<(&'static str, String), (TransactionKind, Money, u64)> = BTreeMap::new();

    for t in transactions {
        if from.is_some_and(|f| t.occurred_on < f) || to.is_some_and(|e| t.occurred_on > e) {
            continue;
        }
        match t.kind {
            TransactionKind::Income => income = income.checked_add(t.amount)?,
            TransactionKind::Expense => expense = expense.checked_add(t.amount)?,
        }
        let slot = buckets
            .entry((t.kind.as_str(), t.category.clone()))
            .or_insert((t.kind, Money::ZERO, 0));
        slot.1 = slot.1.checked_add(t.amount)?;
        slot.2 += 1;
    }

    let by_category = buckets
        .into_iter()
        .map(|((_, category), (kind, total, count))| CategoryTotal { kind, category, total, count })
        .collect();

    Ok(FinanceSummary {
        from,
        to,
        income,
        expense,
        net: income.amount() - expense.amount(),
        by_category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionDraft;
    use chrono::Utc;
    use proptest::prelude::*;
    use salonbook_core::OwnerId;

    fn tx(kind: TransactionKind, category: &str, amount: i64, day: u32) -> FinanceTransaction {
        FinanceTransaction::create(
            OwnerId::new(),
            TransactionDraft {
                kind,
                category: category.to_string(),
                amount: Money::new(amount).unwrap(),
                occurred_on: NaiveDate::from_ymd_opt(2026, 4, day).unwrap(),
                description: None,
                reference: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn groups_by_kind_and_category_within_range() {
        let txs = vec![
            tx(TransactionKind::Income, "services", 500, 1),
            tx(TransactionKind::Income, "services", 300, 10),
            tx(TransactionKind::Income, "retail", 200, 10),
            tx(TransactionKind::Expense, "payroll", 1200, 15),
            tx(TransactionKind::Expense, "rent", 900, 30),
        ];
        let from = NaiveDate::from_ymd_opt(2026, 4, 2);
        let to = NaiveDate::from_ymd_opt(2026, 4, 15);
        let s = summarize(&txs, from, to).unwrap();

        assert_eq!(s.income.amount(), 500);
        assert_eq!(s.expense.amount(), 1200);
        assert_eq!(s.net, -700);
        let cats: Vec<_> = s.by_category.iter().map(|c| (c.category.as_str(), c.total.amount(), c.count)).collect();
        assert_eq!(cats, vec![("payroll", 1200, 1), ("retail", 200, 1), ("services", 300, 1)]);
    }

    #[test]
    fn empty_input_is_zero() {
        let s = summarize(std::iter::empty(), None, None).unwrap();
        assert_eq!(s.net, 0);
        assert!(s.by_category.is_empty());
    }

    proptest! {
        #[test]
        fn net_is_income_minus_expense(amounts in proptest::collection::vec((any::<bool>(), 1i64..1_000_000), 0..30)) {
            let txs: Vec<_> = amounts
                .iter()
                .map(|(inc, a)| tx(if *inc { TransactionKind::Income } else { TransactionKind::Expense }, "x", *a, 1))
                .collect();
            let s = summarize(&txs, None, None).unwrap();
            prop_assert_eq!(s.net, s.income.amount() - s.expense.amount());
            let cat_sum: i64 = s.by_category.iter().map(|c| c.total.amount()).sum();
            prop_assert_eq!(cat_sum, s.income.amount() + s.expense.amount());
        }
    }
}
