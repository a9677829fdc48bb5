/*! Reed-Solomon (8-bit symbol) encoder-free decoder.

Only decoding is needed — this crate never transmits. Builds a generator
polynomial by successive convolution over the roots `alpha^(first_root
..first_root+num_roots)`, computes syndromes by Horner's rule, solves the
error locator with Berlekamp-Massey, finds error positions with a Chien
search, and computes error magnitudes with Forney's algorithm.

`min_distance` reserves that many correction slots: the decode acceptance
check is `error_count <= num_roots/2 - min_distance`, so setting
`min_distance >= num_roots/2` makes the decoder detection-only (it will
never apply a correction, only report success-with-zero-errors or
failure) -- used for "IL2P without CRC" where an undetected miscorrection
would be worse than a dropped frame.
*/

use crate::gf::GaloisField;

/// A Reed-Solomon decoder over GF(2^8) for a fixed `(first_root,
/// num_roots)` code.
pub struct ReedSolomon {
    gf: GaloisField,
    first_root: u32,
    num_roots: usize,
}

/// Outcome of a decode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// Decode (or pure detection) succeeded; carries the number of symbols
    /// corrected (0 for a clean block, or when running in detection-only
    /// mode).
    Ok(usize),
    /// Too many errors to correct (or, in detection-only mode, any errors
    /// at all were detected).
    Fail,
}

impl ReedSolomon {
    /// Build an RS(.., ..) decoder: `num_roots` consecutive roots of the
    /// generator polynomial starting at `alpha^first_root`, over GF(2^
    /// gf_power) built from `gf_poly`.
    pub fn new(first_root: u32, num_roots: usize, gf_power: u32, gf_poly: u32) -> Self {
        Self { gf: GaloisField::new(gf_power, gf_poly), first_root, num_roots }
    }

    /// IL2P header RS(15,13): 2 parity roots, GF(256), primitive 0x11D.
    pub fn il2p_header() -> Self {
        Self::new(0, 2, 8, 0x11D)
    }

    /// IL2P data-block RS(n+16,n): 16 parity roots, GF(256), primitive
    /// 0x11D.
    pub fn il2p_block() -> Self {
        Self::new(0, 16, 8, 0x11D)
    }

    /// Number of parity (root) symbols this code carries.
    pub fn num_roots(&self) -> usize {
        self.num_roots
    }

    fn syndromes(&self, data: &[u8], block_size: usize) -> Vec<u32> {
        (0..self.num_roots)
            .map(|i| {
                let x = self.gf.alpha_pow(self.first_root as i64 + i as i64);
                let mut s = 0u32;
                for &byte in &data[..block_size - 1] {
                    s = self.gf.mul(s ^ byte as u32, x);
                }
                s ^ data[block_size - 1] as u32
            })
            .collect()
    }

    /// Decode `data[..block_size]` in place, correcting up to
    /// `num_roots/2 - min_distance` symbol errors. Returns the number of
    /// symbols corrected, or `Decoded::Fail` if uncorrectable (post-
    /// correction syndromes are re-checked and must all be zero).
    pub fn decode(&self, data: &mut [u8], block_size: usize, min_distance: usize) -> Decoded {
        let order = self.gf.order() as i64;
        let mut syndromes = self.syndromes(data, block_size);

        // Berlekamp-Massey.
        let mut error_locator = vec![0u32; self.num_roots];
        let mut next_error_locator = vec![0u32; self.num_roots];
        let mut correction_poly = vec![0u32; self.num_roots + 1];
        error_locator[0] = 1;
        correction_poly[1] = 1;
        let mut order_tracker = 0usize;
        for step_factor in 1..=self.num_roots {
            let y = step_factor - 1;
            let mut e = syndromes[y];
            for i in 1..=order_tracker {
                e ^= self.gf.mul(error_locator[i], syndromes[y - i]);
            }
            if e != 0 {
                for i in 0..=order_tracker {
                    next_error_locator[i] = error_locator[i] ^ self.gf.mul(e, correction_poly[i]);
                }
                let e_inv = self.gf.inverse(e);
                for i in 0..=(self.num_roots / 2) {
                    correction_poly[i] = self.gf.mul(error_locator[i], e_inv);
                }
                error_locator[..=(self.num_roots / 2)]
                    .copy_from_slice(&next_error_locator[..=(self.num_roots / 2)]);
            }
            if 2 * order_tracker < step_factor {
                order_tracker = step_factor - order_tracker;
            }
            for i in (1..=self.num_roots).rev() {
                correction_poly[i] = correction_poly[i - 1];
            }
            correction_poly[0] = 0;
        }

        // Chien search for error locations.
        let mut error_locations = Vec::new();
        for j in 0..block_size {
            let mut x = 0u32;
            let y = j as i64 + order - block_size as i64;
            for i in 1..=(self.num_roots / 2) {
                if error_locator[i] != 0 {
                    let mut z = y * i as i64 + self.gf.index_of(error_locator[i]) as i64;
                    while z > order - 2 {
                        z -= order - 1;
                    }
                    x ^= self.gf.alpha_pow(z);
                }
            }
            x ^= error_locator[0];
            if x == 0 {
                error_locations.push(j);
            }
        }

        let error_count = error_locations.len();
        if error_count > (self.num_roots / 2).saturating_sub(min_distance) {
            return Decoded::Fail;
        }

        // Forney's algorithm: error magnitudes from the error locator and
        // syndromes.
        let mut omega = vec![0u32; error_count];
        for i in 0..error_count {
            omega[i] = syndromes[self.first_root as usize + i];
            for j in 1..=i {
                omega[i] ^= self.gf.mul(syndromes[self.first_root as usize + i - j], error_locator[j]);
            }
        }
        for i in 0..error_count {
            let e = block_size as i64 - error_locations[i] as i64 - 1;
            let mut z = omega[0];
            for j in 1..error_count {
                let mut x = e * j as i64;
                while x > order - 2 {
                    x -= order - 1;
                }
                x = order - x - 1;
                while x > order - 2 {
                    x -= order - 1;
                }
                z ^= self.gf.mul(omega[j], self.gf.alpha_pow(x));
            }
            z = self.gf.mul(z, self.gf.alpha_pow(e));

            let mut y = error_locator[1];
            let mut j = 3;
            while j <= self.num_roots / 2 {
                let mut x = e * (j as i64 - 1);
                while x > order - 2 {
                    x -= order - 1;
                }
                x = order - x - 1;
                while x > order - 2 {
                    x -= order - 1;
                }
                y ^= self.gf.mul(error_locator[j], self.gf.alpha_pow(x));
                j += 2;
            }
            let mut y_log = self.gf.index_of(y) as i64;
            y_log = order - y_log - 1;
            if y_log == order - 1 {
                y_log = 0;
            }
            let y_val = self.gf.alpha_pow(y_log);

            let magnitude = self.gf.mul(y_val, z);
            data[error_locations[i]] ^= magnitude as u8;
        }

        // Re-verify: corrected data must have all-zero syndromes.
        syndromes = self.syndromes(data, block_size);
        if syndromes.iter().any(|&s| s != 0) {
            return Decoded::Fail;
        }
        Decoded::Ok(error_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_block(rs: &ReedSolomon, payload: &[u8]) -> Vec<u8> {
        // Systematic encode via polynomial division in GF(256), built the
        // same way the generator polynomial is: used only by tests, since
        // this crate is decode-only in production.
        let gf = &rs.gf;
        let mut genpoly = vec![gf.alpha_pow(rs.first_root as i64), 1];
        for i in (rs.first_root + 1)..(rs.first_root + rs.num_roots as u32) {
            let factor = [gf.alpha_pow(i as i64), 1];
            genpoly = convolve(gf, &genpoly, &factor);
        }
        let mut msg = vec![0u8; payload.len() + rs.num_roots];
        msg[..payload.len()].copy_from_slice(payload);
        for i in 0..payload.len() {
            let coef = msg[i];
            if coef != 0 {
                for (j, &g) in genpoly.iter().enumerate().take(rs.num_roots) {
                    msg[i + j + 1] ^= gf.mul(g, coef as u32) as u8;
                }
            }
        }
        let mut out = payload.to_vec();
        out.extend_from_slice(&msg[payload.len()..]);
        out
    }

    fn convolve(gf: &GaloisField, a: &[u32], b: &[u32]) -> Vec<u32> {
        let mut out = vec![0u32; a.len() + b.len() - 1];
        for (i, &ai) in a.iter().enumerate() {
            for (j, &bj) in b.iter().enumerate() {
                out[i + j] ^= gf.mul(ai, bj);
            }
        }
        out
    }

    #[test]
    fn clean_block_decodes_with_zero_corrections() {
        let rs = ReedSolomon::il2p_header();
        let payload: Vec<u8> = (0u8..13).collect();
        let mut block = encode_block(&rs, &payload);
        let result = rs.decode(&mut block, 15, 0);
        assert_eq!(result, Decoded::Ok(0));
        assert_eq!(&block[..13], &payload[..]);
    }

    #[test]
    fn single_byte_error_is_corrected() {
        let rs = ReedSolomon::il2p_header();
        let payload: Vec<u8> = (0u8..13).collect();
        let mut block = encode_block(&rs, &payload);
        block[5] ^= 0xFF;
        let result = rs.decode(&mut block, 15, 0);
        assert_eq!(result, Decoded::Ok(1));
        assert_eq!(&block[..13], &payload[..]);
    }

    #[test]
    fn block_rs_corrects_up_to_half_parity_errors() {
        let rs = ReedSolomon::il2p_block();
        let payload: Vec<u8> = (0..32).map(|i| (i * 7) as u8).collect();
        let mut block = encode_block(&rs, &payload);
        for i in [0usize, 5, 10, 15, 20, 25, 30, 40] {
            block[i] ^= 0xAA;
        }
        let result = rs.decode(&mut block, 48, 0);
        assert_eq!(result, Decoded::Ok(8));
        assert_eq!(&block[..32], &payload[..]);
    }

    #[test]
    fn too_many_errors_fails() {
        let rs = ReedSolomon::il2p_block();
        let payload: Vec<u8> = (0..32).map(|i| (i * 3) as u8).collect();
        let mut block = encode_block(&rs, &payload);
        for i in 0..9 {
            block[i] ^= 0x55;
        }
        let result = rs.decode(&mut block, 48, 0);
        assert_eq!(result, Decoded::Fail);
    }

    #[test]
    fn min_distance_at_half_roots_is_detection_only() {
        let rs = ReedSolomon::il2p_block();
        let payload: Vec<u8> = (0..32).map(|i| i as u8).collect();
        let mut clean = encode_block(&rs, &payload);
        assert_eq!(rs.decode(&mut clean.clone(), 48, 8), Decoded::Ok(0));

        let mut tampered = clean.clone();
        tampered[0] ^= 0xFF;
        assert_eq!(rs.decode(&mut tampered, 48, 8), Decoded::Fail);
        let _ = clean.pop();
    }
}
