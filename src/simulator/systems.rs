pub mod force_compute;
pub mod position_compute;
pub mod position_update;
