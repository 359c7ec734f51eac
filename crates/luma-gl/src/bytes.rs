//! Byte views of vertex data for buffer uploads.

use crate::buffer::ElementType;

/// A scalar that can be uploaded to a vertex buffer as-is.
///
/// # Safety
///
/// Only implement on plain numeric types with no padding, whose in-memory
/// representation is what the GPU expects for [`ELEMENT_TYPE`](Self::ELEMENT_TYPE).
pub unsafe trait AsBytes: Copy + Sized {
    const ELEMENT_TYPE: ElementType;
}

unsafe impl AsBytes for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::Float;
}

unsafe impl AsBytes for i32 {
    const ELEMENT_TYPE: ElementType = ElementType::Int;
}

unsafe impl AsBytes for u32 {
    const ELEMENT_TYPE: ElementType = ElementType::UnsignedInt;
}

unsafe impl AsBytes for i16 {
    const ELEMENT_TYPE: ElementType = ElementType::Short;
}

unsafe impl AsBytes for u16 {
    const ELEMENT_TYPE: ElementType = ElementType::UnsignedShort;
}

unsafe impl AsBytes for i8 {
    const ELEMENT_TYPE: ElementType = ElementType::Byte;
}

unsafe impl AsBytes for u8 {
    const ELEMENT_TYPE: ElementType = ElementType::UnsignedByte;
}

/// View a slice of scalars as bytes.
pub fn slice_as_bytes<T: AsBytes>(data: &[T]) -> &[u8] {
    // SAFETY: `AsBytes` types are padding-free plain numbers.
    unsafe { std::slice::from_raw_parts(data.as_ptr().cast::<u8>(), std::mem::size_of_val(data)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_length_matches() {
        let data = [1.0f32, 2.0, 3.0];
        assert_eq!(slice_as_bytes(&data).len(), 12);
        assert_eq!(slice_as_bytes(&data)[..4], 1.0f32.to_ne_bytes());
        assert_eq!(<u16 as AsBytes>::ELEMENT_TYPE, ElementType::UnsignedShort);
    }
}
