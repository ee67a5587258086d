//! The 2x3 affine matrix mapping an image's unit square to device space,
//! and the silent-override rule a type-3 image splitter applies to a
//! mask's matrix in "separate source" and "scan lines" mode.

/// `[a b c d tx ty]`: `(x', y') = (a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageMatrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl ImageMatrix {
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 }
    }

    /// Overrides a caller-supplied mask matrix with a pure scale of the
    /// image's matrix, dropping any shear the image matrix carried and
    /// rescaling by the mask-to-image resolution ratio. The caller's own
    /// mask matrix is discarded entirely — this mirrors the upstream
    /// behavior named in the open questions, kept rather than "fixed".
    pub fn derive_mask_matrix(
        image_matrix: &ImageMatrix,
        mask_width: u32,
        mask_height: u32,
        image_width: u32,
        image_height: u32,
    ) -> ImageMatrix {
        let sx = image_width as f64 / mask_width as f64;
        let sy = image_height as f64 / mask_height as f64;
        ImageMatrix {
            a: image_matrix.a * sx,
            b: 0.0,
            c: 0.0,
            d: image_matrix.d * sy,
            tx: image_matrix.tx,
            ty: image_matrix.ty,
        }
    }
}
