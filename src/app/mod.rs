pub mod ports;
pub mod fetch_use_case;
