// Domain layer - timecodes, job model and encoding presets

pub mod model;
pub mod profiles;
pub mod timecode;
