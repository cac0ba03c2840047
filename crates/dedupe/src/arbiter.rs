//! Source-trust arbitration between two records of the same identity.

use std::cmp::Ordering;

use crate::model::{ListingCandidate, Source};

/// Total trust order over listing sources. Higher rank wins arbitration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustRanking {
    /// Most trusted first.
    order: Vec<Source>,
}

impl Default for TrustRanking {
    fn default() -> Self {
        Self::new(vec![
            Source::Rightmove,
            Source::OnTheMarket,
            Source::Zoopla,
            Source::SpareRoom,
        ])
    }
}

impl TrustRanking {
    pub fn new(order: Vec<Source>) -> Self {
        Self { order }
    }

    /// Rank of `source`; unranked sources get 0.
    pub fn rank(&self, source: Source) -> usize {
        self.order
            .iter()
            .position(|s| *s == source)
            .map(|i| self.order.len() - i)
            .unwrap_or(0)
    }

    /// Pick the record that should represent the identity.
    ///
    /// The higher-ranked source wins. Equal ranks fall back to a fixed order over
    /// the records' content, so the outcome never depends on argument order.
    pub fn choose_preferred<'a>(
        &self,
        existing: &'a ListingCandidate,
        candidate: &'a ListingCandidate,
    ) -> &'a ListingCandidate {
        match self.rank(existing.source).cmp(&self.rank(candidate.source)) {
            Ordering::Greater => existing,
            Ordering::Less => candidate,
            Ordering::Equal => {
                if candidate.content_order() < existing.content_order() {
                    candidate
                } else {
                    existing
                }
            }
        }
    }
}

/// [`TrustRanking::choose_preferred`] with the default ranking.
pub fn choose_preferred(existing: &ListingCandidate, candidate: &ListingCandidate) -> ListingCandidate {
    TrustRanking::default()
        .choose_preferred(existing, candidate)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(source: Source, id: &str, rent: Option<u32>) -> ListingCandidate {
        ListingCandidate {
            source,
            area: "Lincoln".into(),
            address: "12 Oak Road, Lincoln, LN1 2AB".into(),
            rent_per_month: rent,
            bedrooms: Some(3),
            bathrooms: Some(1),
            url: format!("https://example.test/{id}"),
            source_listing_id: id.into(),
        }
    }

    #[test]
    fn default_ranks() {
        let t = TrustRanking::default();
        assert!(t.rank(Source::Rightmove) > t.rank(Source::OnTheMarket));
        assert!(t.rank(Source::OnTheMarket) > t.rank(Source::Zoopla));
        assert!(t.rank(Source::Zoopla) > t.rank(Source::SpareRoom));
        assert!(t.rank(Source::SpareRoom) > 0);
    }

    #[test]
    fn unranked_source_is_zero() {
        let t = TrustRanking::new(vec![Source::Zoopla]);
        assert_eq!(t.rank(Source::Zoopla), 1);
        assert_eq!(t.rank(Source::Rightmove), 0);
    }

    #[test]
    fn higher_trust_wins_both_ways() {
        let rm = listing(Source::Rightmove, "rm-1", Some(1000));
        let zp = listing(Source::Zoopla, "zp-1", Some(990));
        assert_eq!(choose_preferred(&rm, &zp), rm);
        assert_eq!(choose_preferred(&zp, &rm), rm);
    }

    #[test]
    fn equal_trust_is_order_independent() {
        let a = listing(Source::Zoopla, "zp-1", Some(1000));
        let b = listing(Source::Zoopla, "zp-2", Some(1000));
        assert_eq!(choose_preferred(&a, &b), choose_preferred(&b, &a));
        assert_eq!(choose_preferred(&a, &b), a);
    }

    #[test]
    fn custom_ranking() {
        let t = TrustRanking::new(vec![
            Source::SpareRoom,
            Source::Zoopla,
            Source::OnTheMarket,
            Source::Rightmove,
        ]);
        let rm = listing(Source::Rightmove, "rm-1", None);
        let sr = listing(Source::SpareRoom, "sr-1", None);
        assert_eq!(t.choose_preferred(&rm, &sr), &sr);
    }
}
