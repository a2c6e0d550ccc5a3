pub mod fetcher;
pub mod rates;

pub use fetcher::ReqwestFetcher;
pub use rates::ExchangeRateClient;
