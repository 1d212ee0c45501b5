// Outbound service clients used by the hazard engine.

pub mod scoring;

pub use scoring::ScoringClient;
