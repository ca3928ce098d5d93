//! Fixed-significant-digit float formatting for the LHE and HepMC3
//! writers. LHE asks for 16 digits "to minimise reparse drift"; HepMC3
//! asks for 17, enough for a bit-exact IEEE double round-trip.

pub fn sig16(x: f64) -> String {
    sig(x, 16)
}

pub fn sig17(x: f64) -> String {
    sig(x, 17)
}

fn sig(x: f64, digits: usize) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    format!("{:.*e}", digits.saturating_sub(1), x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_formats_as_plain_zero() {
        assert_eq!(sig16(0.0), "0");
    }

    #[test]
    fn nonzero_round_trips() {
        let x = 1.234567890123456e7;
        let s = sig17(x);
        let parsed: f64 = s.parse().unwrap();
        assert!((parsed - x).abs() / x.abs() < 1e-14);
    }
}
