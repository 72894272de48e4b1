pub mod calibration;
pub mod cosmetic;
