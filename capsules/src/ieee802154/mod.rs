pub mod device;
pub mod framer;
pub mod mac;
pub mod virtual_mac;
pub mod xmac;

mod driver;

pub use self::driver::RadioDriver;
pub use self::driver::DRIVER_NUM;
