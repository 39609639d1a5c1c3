/// Borrowed 8-bit grayscale frame handed to a marker detector.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer, checking that its length matches the dimensions.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions { width, height });
        }
        let expected = width
            .checked_mul(height)
            .ok_or(ImageError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let data = [0u8; 5];
        assert_eq!(
            GrayImageView::new(2, 3, &data).unwrap_err(),
            ImageError::InvalidBuffer {
                expected: 6,
                got: 5
            }
        );
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(matches!(
            GrayImageView::new(0, 3, &[]),
            Err(ImageError::InvalidDimensions { .. })
        ));
    }
}
