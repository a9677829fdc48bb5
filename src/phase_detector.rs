/*! MPSK phase-error detector.

Computes the phase error of a complex sample relative to the nearest
point of an order-`M` PSK constellation, via a precomputed 2-D lookup
table keyed on quantized `(I, Q)`. `atan2` is symmetric across all four
quadrants (`atan2(q,i) = pi - atan2(q,-i)` etc), so only the first
quadrant's *magnitude* angle needs to be tabulated; the other three
quadrants are reconstructed from it plus the sign bits of `I` and `Q`.

An implementation may instead call `atan2` directly per sample (optionally
accelerated via the `fast-math` feature); both approaches must produce the
same angle-error curve at the table's quantization.
*/

use crate::Float;

/// A precomputed phase-error lookup table for an order-`order` PSK
/// constellation (2 for BPSK, 4 for QPSK, etc).
pub struct PhaseDetector {
    order: u32,
    levels: usize,
    /// First-quadrant angle table: `table[qi][qq]` holds `atan2(|Q|,|I|)`
    /// for quantized magnitudes, always in `[0, pi/2]`.
    table: Vec<Vec<Float>>,
}

impl PhaseDetector {
    /// Build a phase detector for an order-`order` constellation,
    /// quantizing each axis of the unit square into `levels` buckets.
    pub fn new(order: u32, levels: usize) -> Self {
        let mut table = vec![vec![0.0 as Float; levels]; levels];
        for (qi, row) in table.iter_mut().enumerate() {
            for (qq, cell) in row.iter_mut().enumerate() {
                let i_mag = (qi as Float + 0.5) / levels as Float;
                let q_mag = (qq as Float + 0.5) / levels as Float;
                *cell = q_mag.atan2(i_mag);
            }
        }
        Self { order, levels, table }
    }

    fn quantize(&self, x: Float) -> usize {
        let ax = x.abs().min(1.0);
        ((ax * self.levels as Float) as usize).min(self.levels - 1)
    }

    /// Wrap a full angle (radians) into the error from the nearest
    /// constellation point of this detector's order, in `(-step/2,
    /// step/2]` where `step = 2*pi/order`.
    fn wrap_to_error(&self, angle: Float) -> Float {
        let pi = std::f64::consts::PI as Float;
        let step = 2.0 * pi / self.order as Float;
        let mut e = angle % step;
        if e > step / 2.0 {
            e -= step;
        } else if e < -step / 2.0 {
            e += step;
        }
        e
    }

    /// Phase error for an MPSK constellation of this detector's order,
    /// using the quadrant-symmetric lookup table.
    pub fn get_angle_error(&self, i: Float, q: Float) -> Float {
        let pi = std::f64::consts::PI as Float;
        let qi = self.quantize(i);
        let qq = self.quantize(q);
        let theta1 = self.table[qi][qq]; // atan2(|q|,|i|), in [0, pi/2].

        // Reconstruct the full-circle angle from quadrant sign bits:
        // atan2(q,i) = theta1 in quadrant I, pi-theta1 in II,
        // theta1-pi in III, -theta1 in IV.
        let angle = match (i >= 0.0, q >= 0.0) {
            (true, true) => theta1,
            (false, true) => pi - theta1,
            (false, false) => theta1 - pi,
            (true, false) => -theta1,
        };
        self.wrap_to_error(angle)
    }

    /// Angle error for a QPSK (order 4) decision-directed constellation.
    pub fn get_angle_error_qpsk(&self, i: Float, q: Float) -> Float {
        debug_assert_eq!(self.order, 4);
        self.get_angle_error(i, q)
    }

    /// Angle error for a BPSK (order 2) constellation.
    pub fn get_angle_error_bpsk(&self, i: Float, q: Float) -> Float {
        debug_assert_eq!(self.order, 2);
        self.get_angle_error(i, q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_constellation_point_has_near_zero_error() {
        let pd = PhaseDetector::new(4, 256);
        let theta = std::f64::consts::FRAC_PI_4 as Float;
        let e = pd.get_angle_error(theta.cos(), theta.sin());
        assert!(e.abs() < 0.05, "error too large: {e}");
    }

    #[test]
    fn matches_direct_atan2_within_quantization() {
        let pd = PhaseDetector::new(4, 512);
        let pi = std::f64::consts::PI as Float;
        for deg in [10.0, 40.0, 80.0, 130.0, 200.0, 260.0, 310.0] {
            let theta = deg * pi / 180.0;
            let (i, q) = (theta.cos(), theta.sin());
            let table_err = pd.get_angle_error(i, q);
            let step = pi / 2.0;
            let mut direct = theta % step;
            if direct > step / 2.0 {
                direct -= step;
            } else if direct < -step / 2.0 {
                direct += step;
            }
            assert!(
                (table_err - direct).abs() < 0.02,
                "deg={deg}: table={table_err} direct={direct}"
            );
        }
    }

    #[test]
    fn error_sign_follows_rotation_direction() {
        let pd = PhaseDetector::new(4, 256);
        let pi = std::f64::consts::PI as Float;
        let base = pi / 4.0;
        let plus = pd.get_angle_error((base + 0.05).cos(), (base + 0.05).sin());
        let minus = pd.get_angle_error((base - 0.05).cos(), (base - 0.05).sin());
        assert!(plus > 0.0);
        assert!(minus < 0.0);
    }

    #[test]
    fn bpsk_order_two_is_finite_everywhere() {
        let pd = PhaseDetector::new(2, 128);
        for (i, q) in [(0.9, 0.1), (-0.9, 0.1), (-0.9, -0.1), (0.9, -0.1)] {
            assert!(pd.get_angle_error(i, q).is_finite());
        }
    }
}
