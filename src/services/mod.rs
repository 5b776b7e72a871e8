pub mod change_feed;
pub mod change_relay;
pub mod live_view;
pub mod network_status;

pub use change_feed::ChangeFeed;
pub use live_view::LiveView;
pub use network_status::NetworkStatus;
