// Renewal reminders. Nothing is remembered between scans.
use crate::models::Subscription;
use crate::store::SubscriptionStore;
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;

/// What kind of reminder this is
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Renewal date is today or already gone
    Expired,
    /// 1-3 days left
    Urgent,
    /// 4-7 days left
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertKind::Expired => write!(f, "Expired"),
            AlertKind::Urgent => write!(f, "Urgent"),
            AlertKind::Warning => write!(f, "Warning"),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
    pub subscription: Subscription,
    pub priority: Priority,
}

impl Alert {
    /// Build the alert for one subscription, if it deserves one
    ///
    /// Anything more than a week out stays quiet.
    pub fn for_subscription(sub: &Subscription, today: NaiveDate) -> Option<Self> {
        let days = sub.days_remaining(today);

        let (kind, priority, title, message) = match days {
            i64::MIN..=0 => (
                AlertKind::Expired,
                Priority::High,
                "Subscription expired",
                format!("Subscription \"{}\" has expired", sub.name),
            ),
            1..=3 => (
                AlertKind::Urgent,
                Priority::Medium,
                "Subscription expires soon",
                format!("Subscription \"{}\" expires in {} days", sub.name, days),
            ),
            4..=7 => (
                AlertKind::Warning,
                Priority::Low,
                "Upcoming renewal",
                format!("Subscription \"{}\" expires in {} days", sub.name, days),
            ),
            _ => return None,
        };

        Some(Self {
            kind,
            title: title.to_string(),
            message,
            subscription: sub.clone(),
            priority,
        })
    }
}

/// Aggregated view of a scan
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    pub alerts: Vec<Alert>,
}

impl AlertSummary {
    pub fn from_alerts(alerts: Vec<Alert>) -> Self {
        let count = |p: Priority| alerts.iter().filter(|a| a.priority == p).count();
        Self {
            total_alerts: alerts.len(),
            high_priority: count(Priority::High),
            medium_priority: count(Priority::Medium),
            low_priority: count(Priority::Low),
            alerts,
        }
    }
}

/// Scans a store and turns renewal dates into alerts
pub struct AlertEngine<'a> {
    store: &'a SubscriptionStore,
}

impl<'a> AlertEngine<'a> {
    pub fn new(store: &'a SubscriptionStore) -> Self {
        Self { store }
    }

    /// One alert per subscription that isn't comfortably active
    pub fn scan(&self) -> Result<Vec<Alert>> {
        let today = self.store.today();
        Ok(Self::scan_subscriptions(&self.store.load_all()?, today))
    }

    pub fn summary(&self) -> Result<AlertSummary> {
        Ok(AlertSummary::from_alerts(self.scan()?))
    }

    /// Scan an already loaded list
    pub fn scan_subscriptions(subscriptions: &[Subscription], today: NaiveDate) -> Vec<Alert> {
        subscriptions
            .iter()
            .filter_map(|sub| Alert::for_subscription(sub, today))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn due_in(days: i64) -> Subscription {
        Subscription {
            id: days,
            name: format!("Sub{}", days),
            renewal_date: today() + Duration::days(days),
            price: 1.0,
            category: "general".to_string(),
            notes: String::new(),
            created_at: today().and_hms_opt(0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_alert_thresholds() {
        let cases = [
            (-1, Some((AlertKind::Expired, Priority::High))),
            (0, Some((AlertKind::Expired, Priority::High))),
            (1, Some((AlertKind::Urgent, Priority::Medium))),
            (3, Some((AlertKind::Urgent, Priority::Medium))),
            (4, Some((AlertKind::Warning, Priority::Low))),
            (7, Some((AlertKind::Warning, Priority::Low))),
            (8, None),
        ];

        for (days, expected) in cases {
            let alert = Alert::for_subscription(&due_in(days), today());
            assert_eq!(
                alert.map(|a| (a.kind, a.priority)),
                expected,
                "days = {}",
                days
            );
        }
    }

    #[test]
    fn test_alert_message_mentions_days() {
        let alert = Alert::for_subscription(&due_in(2), today()).unwrap();
        assert_eq!(alert.message, "Subscription \"Sub2\" expires in 2 days");
        assert_eq!(alert.subscription.id, 2);
    }

    #[test]
    fn test_summary_counts() {
        let subs: Vec<_> = [-5, 0, 2, 5, 6, 30].into_iter().map(due_in).collect();
        let summary =
            AlertSummary::from_alerts(AlertEngine::scan_subscriptions(&subs, today()));

        assert_eq!(summary.total_alerts, 5);
        assert_eq!(summary.high_priority, 2);
        assert_eq!(summary.medium_priority, 1);
        assert_eq!(summary.low_priority, 2);
        assert_eq!(summary.alerts.len(), 5);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }
}
