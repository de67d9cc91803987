// Domain layer: envelope model and the ports the client is wired with.

pub mod model;
pub mod ports;
