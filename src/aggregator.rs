//! Per-page reconciliation of listings into one current price per token

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::feed::{Activity, NftKey};

/// Current lowest known active listing for a token.
///
/// `current_price == None` means no listing is known to be active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFact {
    pub nft_key: NftKey,
    pub current_price: Option<Decimal>,
    pub last_listing_timestamp: DateTime<Utc>,
}

pub type PriceFacts = BTreeMap<NftKey, PriceFact>;

#[derive(Debug, Clone, Copy, Default)]
pub struct PriceAggregator;

impl PriceAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Fold one page of activities, in feed order, into price facts.
    ///
    /// Only the page is considered; use [`aggregate_seeded`](Self::aggregate_seeded)
    /// to continue from stored prices.
    pub fn aggregate(&self, activities: &[Activity], now: DateTime<Utc>) -> PriceFacts {
        self.aggregate_seeded(Vec::new(), activities, now)
    }

    /// Like [`aggregate`](Self::aggregate), but keys present in `seed` count as
    /// already seen, so their first activity in the page is reconciled against
    /// the seeded fact instead of replacing it.
    pub fn aggregate_seeded(
        &self,
        seed: impl IntoIterator<Item = PriceFact>,
        activities: &[Activity],
        now: DateTime<Utc>,
    ) -> PriceFacts {
        let mut facts: PriceFacts = seed
            .into_iter()
            .map(|fact| (fact.nft_key.clone(), fact))
            .collect();
        let mut touched = BTreeSet::new();

        for activity in activities {
            touched.insert(activity.nft_key.clone());

            match facts.get_mut(&activity.nft_key) {
                None => {
                    facts.insert(
                        activity.nft_key.clone(),
                        PriceFact {
                            nft_key: activity.nft_key.clone(),
                            current_price: Some(activity.price),
                            last_listing_timestamp: activity.observed_at,
                        },
                    );
                }
                Some(fact) => apply(fact, activity, now),
            }
        }

        facts.retain(|key, _| touched.contains(key));
        facts
    }
}

fn apply(fact: &mut PriceFact, activity: &Activity, now: DateTime<Utc>) {
    if activity.window.is_expired(now) {
        // a lapsed listing newer than anything seen voids the tracked price
        if activity.observed_at > fact.last_listing_timestamp {
            fact.current_price = None;
        }
    } else {
        fact.current_price = Some(match fact.current_price {
            Some(current) => current.min(activity.price),
            None => activity.price,
        });
    }
    fact.last_listing_timestamp = activity.observed_at;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ListingWindow;
    use chrono::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn listing(id: &str, token: &str, price: i64, to: Option<DateTime<Utc>>, observed_at: DateTime<Utc>) -> Activity {
        Activity {
            nft_key: NftKey::new("0xabc", token),
            price: Decimal::from(price),
            maker: "0xmaker".into(),
            window: ListingWindow { from: None, to },
            observed_at,
            source_event_id: id.into(),
            order_id: format!("order-{}", id),
        }
    }

    fn price_of(facts: &PriceFacts, token: &str) -> Option<Decimal> {
        facts[&NftKey::new("0xabc", token)].current_price
    }

    #[test]
    fn lowest_active_price_wins_within_page() {
        let now = at(0);
        let facts = PriceAggregator::new().aggregate(
            &[
                listing("1", "7", 5, Some(now + Duration::seconds(1000)), at(-20)),
                listing("2", "7", 3, Some(now + Duration::seconds(1000)), at(-10)),
            ],
            now,
        );

        assert_eq!(facts.len(), 1);
        assert_eq!(price_of(&facts, "7"), Some(Decimal::from(3)));
        assert_eq!(facts[&NftKey::new("0xabc", "7")].last_listing_timestamp, at(-10));
    }

    #[test]
    fn higher_active_listing_does_not_raise_price() {
        let now = at(0);
        let facts = PriceAggregator::new().aggregate(
            &[
                listing("1", "7", 3, None, at(-20)),
                listing("2", "7", 9, None, at(-10)),
            ],
            now,
        );
        assert_eq!(price_of(&facts, "7"), Some(Decimal::from(3)));
    }

    #[test]
    fn newer_expired_listing_clears_price() {
        let now = at(0);
        let lapsed = Some(now - Duration::seconds(10));
        let facts = PriceAggregator::new().aggregate(
            &[
                listing("1", "7", 5, lapsed, at(-100)),
                listing("2", "7", 4, lapsed, at(-50)),
            ],
            now,
        );
        assert_eq!(price_of(&facts, "7"), None);
    }

    #[test]
    fn older_expired_listing_keeps_price() {
        let now = at(0);
        let facts = PriceAggregator::new().aggregate(
            &[
                listing("1", "7", 5, None, at(-50)),
                listing("2", "7", 1, Some(now - Duration::seconds(10)), at(-100)),
            ],
            now,
        );
        assert_eq!(price_of(&facts, "7"), Some(Decimal::from(5)));
        // timestamp follows the last applied activity
        assert_eq!(facts[&NftKey::new("0xabc", "7")].last_listing_timestamp, at(-100));
    }

    #[test]
    fn active_listing_after_cleared_price_sets_it() {
        let now = at(0);
        let lapsed = Some(now - Duration::seconds(10));
        let facts = PriceAggregator::new().aggregate(
            &[
                listing("1", "7", 5, lapsed, at(-100)),
                listing("2", "7", 5, lapsed, at(-50)),
                listing("3", "7", 7, Some(now + Duration::seconds(60)), at(-10)),
            ],
            now,
        );
        assert_eq!(price_of(&facts, "7"), Some(Decimal::from(7)));
    }

    #[test]
    fn listing_expiring_exactly_now_is_active() {
        let now = at(0);
        let facts = PriceAggregator::new().aggregate(
            &[
                listing("1", "7", 5, None, at(-100)),
                listing("2", "7", 2, Some(now), at(-50)),
            ],
            now,
        );
        assert_eq!(price_of(&facts, "7"), Some(Decimal::from(2)));
    }

    #[test]
    fn first_activity_seeds_even_when_expired() {
        let now = at(0);
        let facts = PriceAggregator::new().aggregate(
            &[listing("1", "7", 5, Some(now - Duration::seconds(10)), at(-100))],
            now,
        );
        assert_eq!(price_of(&facts, "7"), Some(Decimal::from(5)));
    }

    #[test]
    fn tokens_are_tracked_independently() {
        let now = at(0);
        let facts = PriceAggregator::new().aggregate(
            &[
                listing("1", "1", 5, None, at(-30)),
                listing("2", "2", 8, None, at(-20)),
                listing("3", "1", 4, None, at(-10)),
            ],
            now,
        );
        assert_eq!(facts.len(), 2);
        assert_eq!(price_of(&facts, "1"), Some(Decimal::from(4)));
        assert_eq!(price_of(&facts, "2"), Some(Decimal::from(8)));
    }

    #[test]
    fn empty_page_yields_no_facts() {
        assert!(PriceAggregator::new().aggregate(&[], at(0)).is_empty());
    }

    #[test]
    fn seeded_price_is_kept_against_higher_listing() {
        let now = at(0);
        let stored = PriceFact {
            nft_key: NftKey::new("0xabc", "7"),
            current_price: Some(Decimal::from(2)),
            last_listing_timestamp: at(-500),
        };
        let untouched = PriceFact {
            nft_key: NftKey::new("0xabc", "99"),
            current_price: Some(Decimal::from(1)),
            last_listing_timestamp: at(-500),
        };

        let facts = PriceAggregator::new().aggregate_seeded(
            vec![stored, untouched],
            &[listing("1", "7", 6, None, at(-10))],
            now,
        );

        assert_eq!(facts.len(), 1);
        assert_eq!(price_of(&facts, "7"), Some(Decimal::from(2)));
        assert_eq!(facts[&NftKey::new("0xabc", "7")].last_listing_timestamp, at(-10));
    }

    #[test]
    fn unseeded_page_overwrites_with_page_minimum() {
        let now = at(0);
        let facts = PriceAggregator::new().aggregate(&[listing("1", "7", 6, None, at(-10))], now);
        assert_eq!(price_of(&facts, "7"), Some(Decimal::from(6)));
    }
}
