//! Order statistics over the active listings of one item.
//!
//! The cutoff averages answer "what would the cheapest N units cost on
//! average": listings are consumed cheapest first, taking only part of the
//! boundary listing, and the price-weighted mean is floored.

use crate::config::AVERAGE_CUTOFFS;
use crate::models::{AuctionListing, StatisticsSummary};

/// Reduce a set of listings to a [`StatisticsSummary`].
///
/// An empty slice yields all zeros.
pub fn aggregate(listings: &[AuctionListing]) -> StatisticsSummary {
    if listings.is_empty() {
        return StatisticsSummary::default();
    }

    let mut sorted: Vec<&AuctionListing> = listings.iter().collect();
    sorted.sort_unstable_by_key(|l| l.auction_price_per_unit);

    let [avg25, avg50, avg100, avg200] = AVERAGE_CUTOFFS.map(|n| cutoff_average(&sorted, n));

    StatisticsSummary {
        min_price: sorted[0].auction_price_per_unit,
        avg25,
        avg50,
        avg100,
        avg200,
        total_volume: listings.iter().map(|l| l.item_count).sum(),
    }
}

/// Floored weighted average of the cheapest `target` units of a
/// price-sorted listing slice. Uses every unit when fewer are listed.
fn cutoff_average(sorted: &[&AuctionListing], target: u64) -> u64 {
    let mut taken: u64 = 0;
    let mut total: u128 = 0;

    for listing in sorted {
        if taken >= target {
            break;
        }
        let take = listing.item_count.min(target - taken);
        total += u128::from(listing.auction_price_per_unit) * u128::from(take);
        taken += take;
    }

    if taken == 0 {
        return 0;
    }
    (total / u128::from(taken)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_listings_do_not_count_toward_average() {
        let listings = vec![AuctionListing::new("a", 10, 0), AuctionListing::new("a", 20, 0)];
        let summary = aggregate(&listings);
        assert_eq!(summary.min_price, 10);
        assert_eq!(summary.avg25, 0);
        assert_eq!(summary.total_volume, 0);
    }

    #[test]
    fn boundary_listing_is_partially_consumed() {
        let sorted_owned = vec![AuctionListing::new("a", 100, 20), AuctionListing::new("a", 200, 50)];
        let sorted: Vec<&AuctionListing> = sorted_owned.iter().collect();
        // 20 * 100 + 5 * 200 = 3000 over 25 units
        assert_eq!(cutoff_average(&sorted, 25), 120);
    }
}
