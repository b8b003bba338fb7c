pub mod accessory;
pub mod api;
pub mod config;
pub mod device;
pub mod hap;

pub use accessory::AccessoryError;
pub use accessory::EspSwitch;
pub use config::AccessoryConfig;
pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
