// Domain layer: row model, artifacts and the ports the core talks through.

pub mod model;
pub mod ports;
