pub mod ble;
pub mod ieee802154;

pub use self::ble::BLEComponent;
pub use self::ieee802154::Ieee802154Component;
