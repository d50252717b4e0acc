pub mod fetcher;
pub mod reservoir;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{FetchedPage, PaginatedFetcher};
pub use reservoir::ReservoirClient;
pub use traits::{Activity, EventsRequest, FeedSource, ListingWindow, NftKey, SortDirection};
