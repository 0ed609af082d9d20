//! SMPTE ST 2084 (PQ) conversions between nits and normalized signal values.

// --- Constants for PQ Conversion ---
const ST2084_Y_MAX: f64 = 10000.0;
const ST2084_M1: f64 = 2610.0 / 16384.0;
const ST2084_M2: f64 = (2523.0 / 4096.0) * 128.0;
const ST2084_C1: f64 = 3424.0 / 4096.0;
const ST2084_C2: f64 = (2413.0 / 4096.0) * 32.0;
const ST2084_C3: f64 = (2392.0 / 4096.0) * 32.0;

/// Inverse EOTF: absolute luminance in nits to a PQ signal in [0.0, 1.0].
#[inline]
pub fn nits_to_pq(nits: f64) -> f64 {
    let y = (nits / ST2084_Y_MAX).max(0.0);
    ((ST2084_C1 + ST2084_C2 * y.powf(ST2084_M1)) / (1.0 + ST2084_C3 * y.powf(ST2084_M1)))
        .powf(ST2084_M2)
}

/// EOTF: PQ signal in [0.0, 1.0] to absolute luminance in nits.
#[inline]
pub fn pq_to_nits(pq: f64) -> f64 {
    if pq <= 0.0 {
        return 0.0;
    }
    let p = pq.min(1.0).powf(1.0 / ST2084_M2);
    let y = ((p - ST2084_C1).max(0.0) / (ST2084_C2 - ST2084_C3 * p)).powf(1.0 / ST2084_M1);
    y * ST2084_Y_MAX
}

/// 12-bit PQ code as carried in Dolby Vision L1 metadata.
pub fn pq12_to_nits(code: u16) -> f64 {
    pq_to_nits(f64::from(code.min(4095)) / 4095.0)
}

/// Nits for every 16-bit PQ code, so the per-pixel loop is a table lookup.
pub struct PqTable {
    nits: Box<[f64]>,
}

impl PqTable {
    pub fn new() -> Self {
        let nits = (0..=u16::MAX)
            .map(|code| pq_to_nits(f64::from(code) / f64::from(u16::MAX)))
            .collect();
        Self { nits }
    }

    #[inline]
    pub fn nits(&self, code: u16) -> f64 {
        self.nits[code as usize]
    }
}

impl Default for PqTable {
    fn default() -> Self {
        Self::new()
    }
}
