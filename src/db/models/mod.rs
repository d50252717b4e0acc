pub mod activities;
pub mod capture_cursors;
pub mod nft_prices;
