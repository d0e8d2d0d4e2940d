/// Daemon configuration file
pub mod settings;

/// Monitor list providers
pub mod sites;

pub use settings::{
    AuthConfig, Config, DashboardConfig, NotifyConfig, ProbeConfig, ScheduleConfig,
    ServerConfig, StorageConfig, TelegramConfig, MONITOR_CONFIG_ENV,
};
pub use sites::{
    parse_site_list, process_env, validate_monitors, EnvLookup, MonitorSource, SiteList,
};
