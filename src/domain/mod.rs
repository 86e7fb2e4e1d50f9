// Domain layer: flight models and ports (browser, storage). No knowledge of concrete adapters.

pub mod model;
pub mod ports;
