// =============================================================================
// CUSTOMER SEGMENTATION (RFM)
// =============================================================================
// Scores a customer's order history on Recency, Frequency and Monetary value
// (1-5 each, 0 when no band matches) and maps the scores to a segment.
// =============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Horizon for the lifetime value estimate (3 years)
pub const LTV_HORIZON_DAYS: i64 = 3 * 365;

/// Upper bound in days for recency scores 5, 4, 3, 2, 1
const RECENCY_BANDS: [i64; 5] = [30, 60, 90, 180, 365];
/// Minimum order count for frequency scores 5, 4, 3, 2, 1
const FREQUENCY_BANDS: [i64; 5] = [10, 6, 3, 2, 1];
/// Minimum total spend for monetary scores 5, 4, 3, 2, 1
const MONETARY_BANDS: [i64; 5] = [10_000, 5_000, 2_500, 1_000, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Segment {
    Vip,
    Premium,
    AtRisk,
    New,
    Inactive,
    Regular,
}

/// The part of an order the scoring looks at
#[derive(Debug, Clone, Copy)]
pub struct OrderSummary {
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmScore {
    pub days_since_last_order: Option<i64>,
    pub purchase_count: i64,
    pub total_spent: Decimal,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub monetary_score: u8,
    pub total_score: u8,
    pub segment: Segment,
    pub lifetime_value: Decimal,
}

/// Score a customer's orders as of `now`.
pub fn score(orders: &[OrderSummary], now: DateTime<Utc>) -> RfmScore {
    if orders.is_empty() {
        // No order history: nothing to score, so the customer is REGULAR
        // rather than falling into the INACTIVE rule on all-zero scores.
        return RfmScore {
            days_since_last_order: None,
            purchase_count: 0,
            total_spent: Decimal::ZERO,
            recency_score: 0,
            frequency_score: 0,
            monetary_score: 0,
            total_score: 0,
            segment: Segment::Regular,
            lifetime_value: Decimal::ZERO,
        };
    }

    let last = orders.iter().map(|o| o.created_at).max().unwrap_or(now);
    let days_since_last_order = (now - last).num_days().max(0);
    let purchase_count = orders.len() as i64;
    let total_spent: Decimal = orders.iter().map(|o| o.total).sum();

    let recency_score = band_score(&RECENCY_BANDS, |limit| days_since_last_order <= limit);
    let frequency_score = band_score(&FREQUENCY_BANDS, |min| purchase_count >= min);
    let monetary_score = band_score(&MONETARY_BANDS, |min| total_spent >= Decimal::from(min));
    let total_score = recency_score + frequency_score + monetary_score;

    RfmScore {
        days_since_last_order: Some(days_since_last_order),
        purchase_count,
        total_spent,
        recency_score,
        frequency_score,
        monetary_score,
        total_score,
        segment: classify(recency_score, frequency_score, monetary_score),
        lifetime_value: lifetime_value(orders),
    }
}

/// First satisfied band wins; bands are ordered from score 5 down to 1.
fn band_score(bands: &[i64; 5], satisfied: impl Fn(i64) -> bool) -> u8 {
    bands
        .iter()
        .position(|&threshold| satisfied(threshold))
        .map_or(0, |index| 5 - index as u8)
}

/// Segment rules, first match wins.
pub fn classify(recency: u8, frequency: u8, monetary: u8) -> Segment {
    let total = recency + frequency + monetary;

    if total >= 13 {
        Segment::Vip
    } else if total >= 10 {
        Segment::Premium
    } else if recency <= 2 && (frequency >= 3 || monetary >= 3) {
        Segment::AtRisk
    } else if recency >= 4 && total < 7 {
        Segment::New
    } else if recency <= 2 && frequency <= 2 && monetary <= 2 {
        Segment::Inactive
    } else {
        Segment::Regular
    }
}

/// Average order value x orders per day x horizon.
///
/// The day span between first and last order is floored at 1.
pub fn lifetime_value(orders: &[OrderSummary]) -> Decimal {
    let (Some(first), Some(last)) = (
        orders.iter().map(|o| o.created_at).min(),
        orders.iter().map(|o| o.created_at).max(),
    ) else {
        return Decimal::ZERO;
    };

    let count = Decimal::from(orders.len() as i64);
    let total: Decimal = orders.iter().map(|o| o.total).sum();
    let average = total / count;
    let span_days = Decimal::from((last - first).num_days().max(1));

    (average * (count / span_days) * Decimal::from(LTV_HORIZON_DAYS)).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn order(days_ago: i64, total: i64, now: DateTime<Utc>) -> OrderSummary {
        OrderSummary {
            created_at: now - Duration::days(days_ago),
            total: Decimal::from(total),
        }
    }

    #[test]
    fn test_zero_orders_score_zero_and_regular() {
        let result = score(&[], Utc::now());
        assert_eq!(result.recency_score, 0);
        assert_eq!(result.frequency_score, 0);
        assert_eq!(result.monetary_score, 0);
        assert_eq!(result.total_score, 0);
        assert_eq!(result.segment, Segment::Regular);
        assert_eq!(result.lifetime_value, Decimal::ZERO);
    }

    #[test]
    fn test_band_edges() {
        let now = Utc::now();

        let result = score(&[order(30, 1000, now)], now);
        assert_eq!(result.recency_score, 5);
        assert_eq!(result.frequency_score, 1);
        assert_eq!(result.monetary_score, 2);

        let result = score(&[order(31, 999, now)], now);
        assert_eq!(result.recency_score, 4);
        assert_eq!(result.monetary_score, 1);

        let result = score(&[order(366, 0, now)], now);
        assert_eq!(result.recency_score, 0);
        assert_eq!(result.monetary_score, 0);
    }

    #[test]
    fn test_frequency_bands() {
        let now = Utc::now();
        let orders: Vec<_> = (0..6).map(|i| order(i, 10, now)).collect();
        assert_eq!(score(&orders, now).frequency_score, 4);

        let orders: Vec<_> = (0..10).map(|i| order(i, 10, now)).collect();
        assert_eq!(score(&orders, now).frequency_score, 5);
    }

    #[test]
    fn test_segment_rules_are_order_sensitive() {
        // Total 13 with recency 5 would also satisfy NEW's recency rule
        assert_eq!(classify(5, 4, 4), Segment::Vip);
        assert_eq!(classify(5, 3, 2), Segment::Premium);
        assert_eq!(classify(2, 3, 1), Segment::AtRisk);
        assert_eq!(classify(1, 1, 3), Segment::AtRisk);
        assert_eq!(classify(5, 1, 0), Segment::New);
        assert_eq!(classify(2, 1, 1), Segment::Inactive);
        assert_eq!(classify(3, 2, 2), Segment::Regular);
    }

    #[test]
    fn test_vip_customer() {
        let now = Utc::now();
        let orders: Vec<_> = (0..10).map(|i| order(i * 3, 1500, now)).collect();
        let result = score(&orders, now);

        assert_eq!(result.total_score, 15);
        assert_eq!(result.total_spent, Decimal::from(15_000));
        assert_eq!(result.segment, Segment::Vip);
    }

    #[test]
    fn test_lifetime_value_floors_span() {
        let now = Utc::now();
        // Two orders on the same day: span floored to 1 day
        let orders = [order(0, 100, now), order(0, 300, now)];
        // avg 200 x (2 / 1) x 1095
        assert_eq!(lifetime_value(&orders), Decimal::from(438_000));

        let orders = [order(0, 100, now), order(10, 100, now)];
        // avg 100 x (2 / 10) x 1095
        assert_eq!(lifetime_value(&orders), Decimal::from(21_900));
    }
}
