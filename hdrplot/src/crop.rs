use crate::error::PlotError;

/// Pixels removed from each edge before measuring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Crop {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
}

impl Crop {
    /// Crop values must be non-negative and even (4:2:0 chroma).
    pub fn validate(&self) -> Result<(), PlotError> {
        let edges = [self.left, self.right, self.top, self.bottom];
        if edges.iter().any(|&v| v < 0 || v % 2 != 0) {
            return Err(PlotError::InvalidCrop);
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        *self == Crop::default()
    }

    /// Output size after cropping a `width`x`height` frame.
    pub fn output_size(&self, width: u32, height: u32) -> Result<(u32, u32), PlotError> {
        self.validate()?;
        let w = i64::from(width) - self.left - self.right;
        let h = i64::from(height) - self.top - self.bottom;
        if w <= 0 || h <= 0 {
            return Err(PlotError::InvalidCrop);
        }
        Ok((w as u32, h as u32))
    }

    /// ffmpeg `crop` filter for this crop, `None` when nothing is removed.
    pub fn filter(&self, width: u32, height: u32) -> Result<Option<String>, PlotError> {
        let (w, h) = self.output_size(width, height)?;
        if self.is_identity() {
            return Ok(None);
        }
        Ok(Some(format!("crop={}:{}:{}:{}", w, h, self.left, self.top)))
    }
}

/// Frames dropped from the plotted series, used to line up plots of
/// different cuts of the same title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Trim {
    pub start: i64,
    pub end: i64,
}

impl Trim {
    /// At least one frame has to survive trimming.
    pub fn validate(&self, frame_count: usize) -> Result<(), PlotError> {
        if self.start < 0 || self.end < 0 {
            return Err(PlotError::InvalidTrim);
        }
        let total = self.start.saturating_add(self.end);
        if total >= frame_count as i64 {
            return Err(PlotError::InvalidTrim);
        }
        Ok(())
    }

    pub fn apply<'a>(&self, values: &'a [f64]) -> Result<&'a [f64], PlotError> {
        self.validate(values.len())?;
        let start = self.start as usize;
        let end = values.len() - self.end as usize;
        Ok(&values[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_or_negative_crop_rejected() {
        let odd = Crop { left: 3, ..Crop::default() };
        assert!(matches!(odd.validate(), Err(PlotError::InvalidCrop)));
        let negative = Crop { bottom: -2, ..Crop::default() };
        assert!(matches!(negative.validate(), Err(PlotError::InvalidCrop)));
        let ok = Crop { left: 240, right: 240, top: 20, bottom: 20 };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_crop_filter() {
        let crop = Crop { left: 240, right: 240, top: 20, bottom: 20 };
        assert_eq!(
            crop.filter(3840, 2160).unwrap().as_deref(),
            Some("crop=3360:2120:240:20")
        );
        assert_eq!(Crop::default().filter(3840, 2160).unwrap(), None);
    }

    #[test]
    fn test_crop_larger_than_frame() {
        let crop = Crop { left: 1000, right: 1000, ..Crop::default() };
        assert!(crop.filter(1920, 1080).is_err());
    }

    #[test]
    fn test_trim_apply() {
        let values: Vec<f64> = (0..10).map(f64::from).collect();
        let trim = Trim { start: 2, end: 3 };
        assert_eq!(trim.apply(&values).unwrap(), &[2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(Trim::default().apply(&values).unwrap().len(), 10);
    }

    #[test]
    fn test_trim_must_leave_frames() {
        assert!(Trim { start: 5, end: 5 }.validate(10).is_err());
        assert!(Trim { start: 5, end: 4 }.validate(10).is_ok());
        assert!(Trim { start: -1, end: 0 }.validate(10).is_err());
        assert!(Trim::default().validate(0).is_err());
    }
}
