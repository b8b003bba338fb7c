mod handler;
mod poller;
mod switch;

pub use switch::AccessoryError;
pub use switch::EspSwitch;
pub use switch::FIRMWARE_REVISION;
pub use switch::MANUFACTURER;
pub use switch::MODEL;
pub use switch::SERIAL_NUMBER;
