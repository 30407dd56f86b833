//! Instrument unit scales and the pressure-to-depth conversion.

pub const CM_PER_M: f64 = 100.0;
pub const DM_PER_M: f64 = 10.0;
pub const MM_PER_M: f64 = 1000.0;
pub const PA_PER_DAPA: f64 = 10.0;
/// 0.01 deg, 0.01 deg C
pub const HUNDREDTHS: f64 = 100.0;
/// 0.1 deg
pub const TENTHS: f64 = 10.0;
/// mV, mA, mOhm
pub const THOUSANDTHS: f64 = 1000.0;

/// Converts gauge-corrected pressure to depth below the surface (hydrostatic).
pub fn pressure_to_depth(pressure_pa: f64, surface_pa: f64, density: f64, gravity: f64) -> f64 {
    (pressure_pa - surface_pa) / (density * gravity)
}

/// Signed smallest rotation from `from` to `to`, in [-180, 180).
pub fn wrap_heading_delta(from: f64, to: f64) -> f64 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn one_decibar_is_about_one_metre() {
        let depth = pressure_to_depth(10_000.0, 0.0, 1025.0, 9.80665);
        assert_relative_eq!(depth, 0.9948, epsilon = 1e-4);
    }

    #[test]
    fn surface_pressure_is_removed() {
        assert_relative_eq!(pressure_to_depth(101_325.0, 101_325.0, 1025.0, 9.8), 0.0);
    }

    #[test]
    fn heading_delta_takes_short_way_round() {
        assert_relative_eq!(wrap_heading_delta(350.0, 10.0), 20.0);
        assert_relative_eq!(wrap_heading_delta(10.0, 350.0), -20.0);
        assert_relative_eq!(wrap_heading_delta(90.0, 270.0), -180.0);
    }
}
