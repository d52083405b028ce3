//! Helper functions for integration tests

use ssf_rs::physics::{Parameter, ParameterRecord};

/// Install a test logger once; later calls are no-ops
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Compute relative error
pub fn relative_error(computed: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-15 {
        computed.abs()
    } else {
        ((computed - expected) / expected).abs()
    }
}

/// A filter one month after commissioning, not inoculated
pub fn young_filter() -> ParameterRecord {
    ParameterRecord::empty()
        .with(Parameter::Protein, 40.0)
        .with(Parameter::Carbohydrate, 60.0)
        .with(Parameter::Biomass, 1.0e7)
        .with(Parameter::SchmutzdeckeAge, 30.0)
        .with(Parameter::GrainSize, 0.3)
        .with_flag(Parameter::Inoculated, false)
}

/// A two-year-old inoculated filter with a well developed Schmutzdecke
pub fn fully_mature() -> ParameterRecord {
    ParameterRecord::empty()
        .with(Parameter::Protein, 185.0)
        .with(Parameter::Carbohydrate, 390.0)
        .with(Parameter::Biomass, 1.0e9)
        .with(Parameter::SchmutzdeckeAge, 730.0)
        .with(Parameter::GrainSize, 0.3)
        .with_flag(Parameter::Inoculated, true)
}

/// Operating point typical of Dutch practice: slow filtration of cold water
/// through fine sand
pub fn dutch_practice() -> ParameterRecord {
    ParameterRecord::empty()
        .with(Parameter::ParticleDiameter, 1.0)
        .with(Parameter::CollectorDiameter, 0.25)
        .with(Parameter::Velocity, 0.3)
        .with(Parameter::Porosity, 0.38)
        .with(Parameter::Temperature, 10.0)
        .with(Parameter::Hamaker, 1.0e-20)
        .with(Parameter::StickingEfficiency, 0.01)
        .with(Parameter::HydraulicConductivity, 0.8)
        .with(Parameter::Tortuosity, 1.3)
        .with(Parameter::SurfaceToVolume, 0.15)
        .with(Parameter::GrainSize, 0.25)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_error() {
        assert!((relative_error(1.0, 1.0) - 0.0).abs() < 1e-10);
        assert!((relative_error(1.1, 1.0) - 0.1).abs() < 1e-10);
        assert!((relative_error(0.9, 1.0) - 0.1).abs() < 1e-10);
    }
}
