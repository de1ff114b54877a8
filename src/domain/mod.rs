// Domain layer - Core types and request rules

pub mod model;
pub mod rules;
