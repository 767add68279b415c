// Domain layer: indicator models and the ports the pipeline is generic over.

pub mod model;
pub mod ports;
