//! Manages the `/etc/bandwatch.conf` file: monitor settings and the
//! initial set of endpoints to watch.

mod config;
mod endpoints;
mod monitor;
mod packet_filter;

pub use config::{Config, ConfigError, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
pub use endpoints::EndpointEntry;
pub use monitor::MonitorConfig;
pub use packet_filter::{FilterError, PacketFilter};
