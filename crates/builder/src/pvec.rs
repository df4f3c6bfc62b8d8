use std::mem::MaybeUninit;

use rayon::prelude::*;

use crate::{Error, SharedMut};

/// A fixed-length buffer whose elements start out uninitialized.
///
/// Kernels and the in-place builder allocate buffers proportional to the
/// node or edge count and immediately overwrite every element from multiple
/// threads. Zeroing such buffers up front is a serial pass over hundreds of
/// millions of entries, so `ParVec` skips it: after [`ParVec::uninit`], an
/// element must be written before it is read.
///
/// The buffer is move-only and can surrender its storage via
/// [`ParVec::into_box`], which is how the in-place builder turns an edge
/// list allocation into CSR target storage without copying.
pub struct ParVec<T> {
    data: Box<[MaybeUninit<T>]>,
}

impl<T> ParVec<T>
where
    T: Copy + Send + Sync,
{
    /// Allocates a buffer of `len` uninitialized elements.
    pub fn uninit(len: usize) -> Result<Self, Error> {
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| Error::Allocation {
            bytes: len * std::mem::size_of::<T>(),
        })?;
        // SAFETY: MaybeUninit<T> does not require initialization and the
        //         capacity was reserved above.
        unsafe {
            data.set_len(len);
        }
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Overwrites every element with `value` in parallel.
    pub fn fill(&mut self, value: T) {
        self.data
            .par_iter_mut()
            .for_each(|slot| *slot = MaybeUninit::new(value));
    }

    /// A shared pointer to the first element, for concurrent disjoint writes.
    pub fn shared_ptr(&mut self) -> SharedMut<T> {
        SharedMut::new(self.data.as_mut_ptr() as *mut T)
    }

    /// Borrows the first `len` elements as an initialized slice.
    ///
    /// # Safety
    ///
    /// All elements in `0..len` must have been written.
    pub unsafe fn assume_init_slice(&self, len: usize) -> &[T] {
        debug_assert!(len <= self.data.len());
        std::slice::from_raw_parts(self.data.as_ptr() as *const T, len)
    }

    /// Releases the storage as an initialized boxed slice.
    ///
    /// # Safety
    ///
    /// Every element must have been written.
    pub unsafe fn into_box(self) -> Box<[T]> {
        let raw = Box::into_raw(self.data);
        Box::from_raw(raw as *mut [T])
    }
}

impl<T> From<Vec<T>> for ParVec<T>
where
    T: Copy + Send + Sync,
{
    fn from(values: Vec<T>) -> Self {
        let mut data = values;
        let (ptr, len, cap) = (data.as_mut_ptr(), data.len(), data.capacity());
        std::mem::forget(data);
        // SAFETY: T and MaybeUninit<T> have the same memory layout.
        let data = unsafe { Vec::from_raw_parts(ptr as *mut MaybeUninit<T>, len, cap) };
        Self {
            data: data.into_boxed_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_initializes_every_slot() {
        let mut v = ParVec::<u32>::uninit(1337).unwrap();
        v.fill(42);
        let values = unsafe { v.into_box() };
        assert_eq!(values.len(), 1337);
        assert!(values.iter().all(|&value| value == 42));
    }

    #[test]
    fn from_vec_keeps_contents() {
        let v = ParVec::from(vec![0, 1, 2, 3]);
        assert_eq!(unsafe { v.assume_init_slice(4) }, &[0, 1, 2, 3]);
    }
}
