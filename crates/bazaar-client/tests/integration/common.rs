use std::time::Duration;

use bazaar_core::config::SearchConfig;

pub const LISTING: &str = include_str!("../../../bazaar-core/tests/fixtures/jersey_listing.html");
pub const DETAIL: &str = include_str!("../../../bazaar-core/tests/fixtures/detail_with_sheet.html");

/// Config pointing every endpoint at a local mock server.
pub fn config_for(server_url: &str) -> SearchConfig {
    SearchConfig {
        base_origin: server_url.trim_end_matches('/').to_string(),
        rates_url: format!("{server_url}/latest"),
        request_timeout: Duration::from_secs(5),
        ..SearchConfig::default()
    }
}
