//! Stateless dedupe of a single batch, without a registry.

use std::collections::HashSet;

use crate::model::ListingCandidate;
use crate::normalize::extract_postcode;

#[derive(Debug, PartialEq, Eq, Hash)]
enum BatchKey {
    Address { address: String, postcode: String },
    Url(String),
}

fn batch_key(candidate: &ListingCandidate) -> Option<BatchKey> {
    let address = candidate.address.trim();
    let postcode = extract_postcode(address);
    if !address.is_empty() && !postcode.is_empty() {
        return Some(BatchKey::Address {
            address: address.to_lowercase(),
            postcode,
        });
    }
    let url = candidate.url.trim();
    if !url.is_empty() {
        return Some(BatchKey::Url(url.to_lowercase()));
    }
    None
}

/// Drop repeats within one batch. Records keyed by address and postcode when
/// both are present, otherwise by URL; records with neither are always kept.
/// The first occurrence of a key wins and order is preserved.
pub fn dedupe_batch(candidates: Vec<ListingCandidate>) -> Vec<ListingCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| match batch_key(c) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;

    fn listing(id: &str, address: &str, url: &str) -> ListingCandidate {
        ListingCandidate {
            source: Source::Zoopla,
            area: "Lincoln".into(),
            address: address.into(),
            rent_per_month: Some(900),
            bedrooms: Some(2),
            bathrooms: None,
            url: url.into(),
            source_listing_id: id.into(),
        }
    }

    fn ids(out: &[ListingCandidate]) -> Vec<&str> {
        out.iter().map(|c| c.source_listing_id.as_str()).collect()
    }

    #[test]
    fn address_and_postcode_key() {
        let out = dedupe_batch(vec![
            listing("1", "12 Oak Road, LN1 2AB", "https://a/1"),
            listing("2", " 12 OAK ROAD, LN1 2AB ", "https://a/2"),
            listing("3", "14 Oak Road, LN1 2AB", "https://a/3"),
        ]);
        assert_eq!(ids(&out), vec!["1", "3"]);
    }

    #[test]
    fn url_fallback_without_postcode() {
        let out = dedupe_batch(vec![
            listing("1", "Oak Road", "https://a/1"),
            listing("2", "Oak Road", "HTTPS://A/1 "),
            listing("3", "Oak Road", "https://a/3"),
        ]);
        assert_eq!(ids(&out), vec!["1", "3"]);
    }

    #[test]
    fn keyless_records_are_kept() {
        let out = dedupe_batch(vec![listing("1", "", ""), listing("2", "Oak Road", "")]);
        assert_eq!(ids(&out), vec!["1", "2"]);
    }
}
