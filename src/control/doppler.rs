//! Doppler model: sky frequency ↔ radio dial frequency.
//!
//! "Sky" is what the satellite actually transmits (or must receive);
//! "radio" is what the rig is tuned to after Doppler and any transverter LO.
//! All functions are pure.

/// Speed of light in km/s, matching the range-rate unit
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Doppler shift in Hz seen on `sky_freq_hz`. Receding targets
/// (positive range-rate) shift down.
pub fn doppler_shift(sky_freq_hz: f64, range_rate_km_s: f64) -> f64 {
    -sky_freq_hz * (range_rate_km_s / SPEED_OF_LIGHT_KM_S)
}

/// Frequency to tune the radio to for a given sky frequency.
pub fn to_radio_freq(sky_freq_hz: f64, lo_hz: f64, range_rate_km_s: f64, tracking: bool) -> f64 {
    if tracking {
        sky_freq_hz + doppler_shift(sky_freq_hz, range_rate_km_s) - lo_hz
    } else {
        sky_freq_hz - lo_hz
    }
}

/// Sky frequency corresponding to a (possibly hand-dialed) radio frequency.
/// Inverse of [`to_radio_freq`] for the same `lo_hz`, range-rate and `tracking`.
pub fn to_sky_freq(radio_freq_hz: f64, lo_hz: f64, range_rate_km_s: f64, tracking: bool) -> f64 {
    if tracking {
        (radio_freq_hz + lo_hz) / (1.0 - range_rate_km_s / SPEED_OF_LIGHT_KM_S)
    } else {
        radio_freq_hz + lo_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn no_shift_at_zero_range_rate() {
        for f in [0.0, 1.0, 145_890_000.0, 10.4e9] {
            assert_eq!(doppler_shift(f, 0.0), 0.0);
        }
    }

    #[test]
    fn receding_target_shifts_down() {
        assert!(doppler_shift(145_890_000.0, 7.5) < 0.0);
        assert!(doppler_shift(145_890_000.0, -7.5) > 0.0);
    }

    #[test]
    fn shift_magnitude_at_two_metres() {
        // 7.5 km/s on 145.89 MHz is roughly 3.65 kHz
        let shift = doppler_shift(145_890_000.0, 7.5);
        assert!((shift + 3649.77).abs() < 0.01, "shift = {shift}");
    }

    #[test]
    fn round_trip_with_tracking() {
        let freqs = [0.0, 29_400_000.0, 145_890_000.0, 435_800_000.0, 2.4e9, 10.45e9];
        let los = [0.0, 100_000_000.0, -116_000_000.0, 9_750_000_000.0];
        let rates = [-299_000.0, -7.5, -0.001, 0.0, 3.2, 7.5, 299_000.0];
        for &f in &freqs {
            for &lo in &los {
                for &rr in &rates {
                    let radio = to_radio_freq(f, lo, rr, true);
                    let back = to_sky_freq(radio, lo, rr, true);
                    assert!(close(back, f), "f={f} lo={lo} rr={rr} back={back}");
                }
            }
        }
    }

    #[test]
    fn without_tracking_only_lo_applies() {
        let f = 145_890_000.0;
        let lo = 100_000_000.0;
        assert_eq!(to_radio_freq(f, lo, 7.5, false), f - lo);
        assert_eq!(to_sky_freq(f, lo, 7.5, false), f + lo);
        assert_eq!(to_sky_freq(to_radio_freq(f, lo, -3.0, false), lo, -3.0, false), f);
    }

    #[test]
    fn transverter_scenario() {
        let radio = to_radio_freq(145_890_000.0, 100_000_000.0, 7.5, true);
        let expected = 145_890_000.0 - 145_890_000.0 * (7.5 / SPEED_OF_LIGHT_KM_S) - 100_000_000.0;
        assert_eq!(radio, expected);
        assert!((radio - 45_886_350.23).abs() < 0.01, "radio = {radio}");
    }
}
