//! Fixed 3-band EQ for the BGM path.
//!
//! Low shelf, mid peak and high shelf in series, using the RBJ cookbook
//! biquads. Coefficients and filter state are kept in `f64`: a +24 dB shelf
//! at 100 Hz puts its poles close to the unit circle, where `f32`
//! coefficients lose enough precision to colour the passband.

use smallvec::SmallVec;
use std::f64::consts::PI;

/// Low-shelf corner frequency.
pub const LOW_SHELF_HZ: f64 = 100.0;
/// Mid peak center frequency.
pub const MID_PEAK_HZ: f64 = 1000.0;
/// Mid peak quality factor.
pub const MID_PEAK_Q: f64 = 1.0;
/// High-shelf corner frequency.
pub const HIGH_SHELF_HZ: f64 = 8000.0;
/// Shelf slope (S = 1 is the steepest slope without overshoot).
pub const SHELF_SLOPE: f64 = 1.0;

/// Normalized biquad coefficients (a0 = 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Unity gain, no filtering.
    pub const PASSTHROUGH: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Low shelf: `gain_db` below `freq`, unity above.
    pub fn low_shelf(freq: f64, gain_db: f64, sample_rate: f64) -> Self {
        let (a, cos_w0, alpha) = shelf_terms(freq, gain_db, sample_rate);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let a0 = (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        Self {
            b0: (a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha)) / a0,
            b1: (2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0)) / a0,
            b2: (a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha)) / a0,
            a1: (-2.0 * ((a - 1.0) + (a + 1.0) * cos_w0)) / a0,
            a2: ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha) / a0,
        }
    }

    /// Peaking bell centered on `freq`.
    pub fn peaking(freq: f64, gain_db: f64, q: f64, sample_rate: f64) -> Self {
        let a = 10f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * clamp_freq(freq, sample_rate) / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q.max(0.05));

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    /// High shelf: `gain_db` above `freq`, unity below.
    pub fn high_shelf(freq: f64, gain_db: f64, sample_rate: f64) -> Self {
        let (a, cos_w0, alpha) = shelf_terms(freq, gain_db, sample_rate);
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        let a0 = (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha;
        Self {
            b0: (a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha)) / a0,
            b1: (-2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0)) / a0,
            b2: (a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha)) / a0,
            a1: (2.0 * ((a - 1.0) - (a + 1.0) * cos_w0)) / a0,
            a2: ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha) / a0,
        }
    }

    /// Both poles strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Magnitude response at `freq`, in dB.
    pub fn magnitude_db(&self, freq: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * freq / sample_rate;
        let (c1, s1) = (w.cos(), w.sin());
        let (c2, s2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        20.0 * (num / den).log10()
    }
}

fn clamp_freq(freq: f64, sample_rate: f64) -> f64 {
    freq.clamp(10.0, 0.45 * sample_rate)
}

fn shelf_terms(freq: f64, gain_db: f64, sample_rate: f64) -> (f64, f64, f64) {
    let a = 10f64.powf(gain_db / 40.0);
    let w0 = 2.0 * PI * clamp_freq(freq, sample_rate) / sample_rate;
    let alpha = w0.sin() / 2.0 * ((a + 1.0 / a) * (1.0 / SHELF_SLOPE - 1.0) + 2.0).sqrt();
    (a, w0.cos(), alpha)
}

/// Direct form I history for one channel.
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let out = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = out;
        out
    }
}

/// One stereo filter band.
#[derive(Debug, Clone)]
struct Band {
    coeffs: BiquadCoeffs,
    left: BiquadState,
    right: BiquadState,
}

impl Band {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            left: BiquadState::default(),
            right: BiquadState::default(),
        }
    }
}

/// Per-band gains of the BGM equalizer, in dB.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EqGains {
    pub low_db: f64,
    pub mid_db: f64,
    pub high_db: f64,
}

impl EqGains {
    /// All bands at 0 dB.
    pub fn is_flat(&self) -> bool {
        self.low_db == 0.0 && self.mid_db == 0.0 && self.high_db == 0.0
    }
}

/// Low shelf → peak → high shelf, processing stereo frames.
///
/// Bands at exactly 0 dB are left out entirely, so a flat EQ passes
/// samples through bit-for-bit.
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    sample_rate: f64,
    bands: SmallVec<[Band; 3]>,
}

impl ThreeBandEq {
    /// Build the filter chain for `gains` at `sample_rate`.
    pub fn new(sample_rate: u32, gains: EqGains) -> Self {
        let sr = sample_rate.max(1) as f64;
        let mut bands = SmallVec::new();
        if gains.low_db != 0.0 {
            bands.push(Band::new(BiquadCoeffs::low_shelf(LOW_SHELF_HZ, gains.low_db, sr)));
        }
        if gains.mid_db != 0.0 {
            bands.push(Band::new(BiquadCoeffs::peaking(
                MID_PEAK_HZ,
                gains.mid_db,
                MID_PEAK_Q,
                sr,
            )));
        }
        if gains.high_db != 0.0 {
            bands.push(Band::new(BiquadCoeffs::high_shelf(HIGH_SHELF_HZ, gains.high_db, sr)));
        }
        Self {
            sample_rate: sr,
            bands,
        }
    }

    /// Whether the EQ leaves the signal untouched.
    pub fn is_bypass(&self) -> bool {
        self.bands.is_empty()
    }

    /// Whether every active band is stable.
    pub fn is_stable(&self) -> bool {
        self.bands.iter().all(|b| b.coeffs.is_stable())
    }

    /// Combined magnitude response at `freq`, in dB.
    pub fn response_db(&self, freq: f64) -> f64 {
        self.bands
            .iter()
            .map(|b| b.coeffs.magnitude_db(freq, self.sample_rate))
            .sum()
    }

    /// Filter one stereo frame.
    #[inline]
    pub fn process_frame(&mut self, left: f64, right: f64) -> (f64, f64) {
        let (mut l, mut r) = (left, right);
        for band in self.bands.iter_mut() {
            l = band.left.process(l, &band.coeffs);
            r = band.right.process(r, &band.coeffs);
        }
        (l, r)
    }

    /// Clear filter history.
    pub fn reset(&mut self) {
        for band in self.bands.iter_mut() {
            band.left = BiquadState::default();
            band.right = BiquadState::default();
        }
    }
}
