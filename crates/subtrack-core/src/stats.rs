use crate::models::{Status, Subscription};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Overview numbers for the statistics screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub active: usize,
    /// Due today, urgent or expiring soon
    pub expiring: usize,
    pub expired: usize,
    pub by_category: Vec<CategoryStat>,
    pub monthly_cost: f64,
    pub yearly_cost: f64,
}

/// Per-category slice of the totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStat {
    pub category: String,
    pub count: usize,
    pub cost: f64,
    /// Share of the overall monthly cost, 0-100
    pub percentage: f64,
}

impl Statistics {
    /// Crunch the numbers for `subscriptions` as of `today`
    ///
    /// A category filter narrows the listed categories only. Percentages
    /// are always taken against the full monthly cost, so a filtered view
    /// still shows each category's real share.
    pub fn compute(subscriptions: &[Subscription], today: NaiveDate, category: Option<&str>) -> Self {
        let mut active = 0;
        let mut expiring = 0;
        let mut expired = 0;
        let mut buckets: BTreeMap<&str, (usize, f64)> = BTreeMap::new();

        for sub in subscriptions {
            match sub.status(today) {
                Status::Active => active += 1,
                Status::Expired => expired += 1,
                s if s.is_expiring() => expiring += 1,
                _ => {}
            }

            let bucket = buckets.entry(sub.category.as_str()).or_insert((0, 0.0));
            bucket.0 += 1;
            bucket.1 += sub.price;
        }

        let monthly_cost: f64 = subscriptions.iter().map(|s| s.price).sum();

        let by_category = buckets
            .into_iter()
            .filter(|(name, _)| category.map_or(true, |c| c == *name))
            .map(|(name, (count, cost))| CategoryStat {
                category: name.to_string(),
                count,
                cost,
                percentage: if monthly_cost > 0.0 {
                    cost / monthly_cost * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        Self {
            total: subscriptions.len(),
            active,
            expiring,
            expired,
            by_category,
            monthly_cost,
            yearly_cost: monthly_cost * 12.0,
        }
    }

    /// Categories that actually cost something, for the cost breakdown
    pub fn paid_categories(&self) -> impl Iterator<Item = &CategoryStat> {
        self.by_category.iter().filter(|c| c.cost > 0.0)
    }
}
