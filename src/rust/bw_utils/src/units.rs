mod down_up;
pub use down_up::*;
