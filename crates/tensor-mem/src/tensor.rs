// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The tensor memory entity.
//!
//! A [`Tensor`] fixes its logical shape, memory format, and element dtype at
//! construction and owns an aligned buffer sized for the physical dims.
//! There is no resize or reformat: producing a differently-laid-out tensor
//! means constructing a new entity.

use crate::{AlignedBuffer, DType, Format, Scalar};

/// Default buffer alignment in bytes (one cache line).
pub const DEFAULT_ALIGNMENT: usize = 64;

/// An owned, layout-aware tensor backed by an aligned buffer.
///
/// # Example
/// ```
/// use tensor_mem::{DType, Format, Tensor, DEFAULT_ALIGNMENT};
/// let t = Tensor::new([1, 3, 1, 1], Format::Nchw, DType::F32, DEFAULT_ALIGNMENT);
/// assert_eq!(t.buffer_size(), 3 * 4);
/// ```
pub struct Tensor {
    nchw_dims: [usize; 4],
    format: Format,
    dtype: DType,
    dims: Vec<usize>,
    buf: AlignedBuffer,
}

impl Tensor {
    /// Creates a zero-filled 4-D tensor.
    ///
    /// The physical dims are derived from `nchw_dims` through the format's
    /// layout mapping; the buffer holds `product(physical) * dtype size`
    /// bytes at the requested alignment.
    ///
    /// # Panics
    /// Panics on any layout-mapping contract violation (see
    /// [`Format::physical_dims`]), on a zero-element shape, and if
    /// `alignment` is not a power of two at least `dtype.size_bytes()`
    /// (typed access requires element alignment).
    pub fn new(nchw_dims: [usize; 4], format: Format, dtype: DType, alignment: usize) -> Self {
        assert!(
            alignment.is_power_of_two() && alignment >= dtype.size_bytes(),
            "alignment {alignment} cannot hold {dtype} elements"
        );
        let dims = format.physical_dims(nchw_dims);
        let elements: usize = dims.iter().product();
        let buf = AlignedBuffer::zeroed(elements * dtype.size_bytes(), alignment);
        Self {
            nchw_dims,
            format,
            dtype,
            dims,
            buf,
        }
    }

    /// Creates a zero-filled 1-D vector tensor in format [`Format::X`].
    ///
    /// The logical shape is `[len, 1, 1, 1]`.
    pub fn vector(len: usize, dtype: DType, alignment: usize) -> Self {
        assert!(
            alignment.is_power_of_two() && alignment >= dtype.size_bytes(),
            "alignment {alignment} cannot hold {dtype} elements"
        );
        let buf = AlignedBuffer::zeroed(len * dtype.size_bytes(), alignment);
        Self {
            nchw_dims: [len, 1, 1, 1],
            format: Format::X,
            dtype,
            dims: vec![len],
            buf,
        }
    }

    /// Returns the canonical NCHW logical shape.
    pub fn nchw_dims(&self) -> [usize; 4] {
        self.nchw_dims
    }

    /// Returns the memory format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the element data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the physical dimension sequence.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the total element count (product of the physical dims).
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the buffer size in bytes.
    pub fn buffer_size(&self) -> usize {
        self.buf.size_bytes()
    }

    /// Element offset of the logical coordinate `(n, c, h, w)` in this
    /// tensor's buffer. Delegates to [`Format::offset`].
    pub fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        self.format.offset(self.nchw_dims, n, c, h, w)
    }

    /// Typed view of the buffer.
    ///
    /// # Panics
    /// Panics if `T` does not match the tensor's dtype.
    pub fn as_slice<T: Scalar>(&self) -> &[T] {
        assert_eq!(
            T::DTYPE,
            self.dtype,
            "typed access as {} on a {} tensor",
            T::DTYPE,
            self.dtype
        );
        // SAFETY: the buffer was allocated for exactly size() elements of
        // this dtype, at an alignment of at least the element size.
        unsafe { std::slice::from_raw_parts(self.buf.as_ptr() as *const T, self.size()) }
    }

    /// Typed mutable view of the buffer.
    ///
    /// # Panics
    /// Panics if `T` does not match the tensor's dtype.
    pub fn as_mut_slice<T: Scalar>(&mut self) -> &mut [T] {
        assert_eq!(
            T::DTYPE,
            self.dtype,
            "typed access as {} on a {} tensor",
            T::DTYPE,
            self.dtype
        );
        let n = self.size();
        // SAFETY: as above, plus exclusive access through &mut self.
        unsafe { std::slice::from_raw_parts_mut(self.buf.as_mut_ptr() as *mut T, n) }
    }

    /// Reads the element at a physical offset, widened to `f32`.
    ///
    /// Kernels use this for mixed-precision inputs (e.g. u8 activations
    /// against s8 weights) without being generic over every source type.
    pub fn load_f32(&self, index: usize) -> f32 {
        match self.dtype {
            DType::F32 => self.as_slice::<f32>()[index],
            DType::S32 => self.as_slice::<i32>()[index] as f32,
            DType::S8 => self.as_slice::<i8>()[index] as f32,
            DType::U8 => self.as_slice::<u8>()[index] as f32,
        }
    }

    /// Overwrites the buffer with `values`.
    ///
    /// # Panics
    /// Panics if the dtype mismatches or `values.len() != self.size()`.
    pub fn copy_from_slice<T: Scalar>(&mut self, values: &[T]) {
        let dst = self.as_mut_slice::<T>();
        assert_eq!(
            values.len(),
            dst.len(),
            "copy_from_slice length {} != tensor element count {}",
            values.len(),
            dst.len()
        );
        dst.copy_from_slice(values);
    }

    /// Fills the buffer with a constant value.
    pub fn fill<T: Scalar>(&mut self, value: T) {
        self.as_mut_slice::<T>().iter_mut().for_each(|x| *x = value);
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("nchw_dims", &self.nchw_dims)
            .field("format", &self.format)
            .field("dtype", &self.dtype)
            .field("dims", &self.dims)
            .field("buffer_size", &self.buffer_size())
            .finish()
    }
}
