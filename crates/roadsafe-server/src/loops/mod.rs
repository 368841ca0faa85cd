//! Background loops for continuous processing.

pub mod expiry_loop;
