use std::sync::atomic::Ordering;

use rayon::prelude::*;

use crate::prelude::*;

/// A lock-free union find structure with union by higher-root.
///
/// `compress` must run before `find` returns final set ids.
pub struct Afforest<NI: Idx>(Box<[Atomic<NI>]>);

unsafe impl<NI: Idx> Send for Afforest<NI> {}
unsafe impl<NI: Idx> Sync for Afforest<NI> {}

impl<NI: Idx> Afforest<NI> {
    /// Creates a new disjoint-set forest of `size` singleton sets.
    pub fn new(size: usize) -> Self {
        let mut v = Vec::with_capacity(size);

        (0..size)
            .into_par_iter()
            .map(|i| Atomic::new(NI::new(i)))
            .collect_into_vec(&mut v);

        Self(v.into_boxed_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Joins the sets of `u` and `v` by linking the higher root under the
    /// lower one.
    pub fn link(&self, u: NI, v: NI) {
        let mut p1 = self.parent(u);
        let mut p2 = self.parent(v);

        while p1 != p2 {
            let high = NI::max(p1, p2);
            let low = NI::min(p1, p2);
            let p_high = self.parent(high);

            if p_high == low
                || (p_high == high && self.update_parent(high, high, low).is_ok())
            {
                break;
            }
            p1 = self.parent(self.parent(high));
            p2 = self.parent(low);
        }
    }

    /// The current set id of `u`.
    pub fn find(&self, u: NI) -> NI {
        self.parent(u)
    }

    /// Shortcuts every node to its root so that each entry stores the final
    /// set id.
    pub fn compress(&self) {
        (0..self.len()).into_par_iter().map(NI::new).for_each(|n| {
            while self.parent(n) != self.parent(self.parent(n)) {
                self.0[n.index()].store(self.parent(self.parent(n)), Ordering::SeqCst)
            }
        });
    }

    #[inline]
    fn parent(&self, i: NI) -> NI {
        unsafe { self.0.get_unchecked(i.index()) }.load(Ordering::SeqCst)
    }

    #[inline]
    fn update_parent(&self, id: NI, current: NI, new: NI) -> Result<NI, NI> {
        unsafe { self.0.get_unchecked(id.index()) }.compare_exchange_weak(
            current,
            new,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
    }

    pub(crate) fn into_components(self) -> Vec<NI> {
        let mut components = std::mem::ManuallyDrop::new(self.0.into_vec());
        let (ptr, len, cap) = (
            components.as_mut_ptr(),
            components.len(),
            components.capacity(),
        );

        // SAFETY: NI and Atomic<NI> have the same memory layout
        unsafe { Vec::from_raw_parts(ptr as *mut NI, len, cap) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_chains_to_lowest_root() {
        let af = Afforest::<u32>::new(10);

        af.link(9, 7);
        af.link(7, 4);
        af.link(4, 2);
        af.link(2, 0);

        af.compress();

        assert_eq!(af.find(9), 0);
    }

    #[test]
    fn link_accepts_either_argument_order() {
        let af = Afforest::<usize>::new(4);

        af.link(2, 0);
        af.link(1, 3);
        af.link(3, 0);

        af.compress();

        assert!((0..4).all(|n| af.find(n) == 0));
    }

    #[test]
    fn compress_is_idempotent() {
        let af = Afforest::<u32>::new(5);

        af.link(0, 1);
        af.link(3, 4);

        af.compress();
        let first = (0..5).map(|n| af.find(n)).collect::<Vec<_>>();
        af.compress();
        let second = (0..5).map(|n| af.find(n)).collect::<Vec<_>>();

        assert_eq!(first, second);
    }
}
