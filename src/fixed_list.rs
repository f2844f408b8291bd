//! FixedList: a bounded list over a caller-owned `[Option<T>]` buffer.
//!
//! Elements occupy the prefix `[0, len)`; everything past it is `None`.

use crate::error::{Error, Result};
use core::fmt;

pub struct FixedList<'a, T> {
    slots: &'a mut [Option<T>],
    len: usize,
}

impl<'a, T> FixedList<'a, T> {
    /// Wrap `slots`, dropping whatever it held. The buffer must not be empty.
    pub fn new(slots: &'a mut [Option<T>]) -> Result<Self> {
        if slots.is_empty() {
            return Err(Error::InvalidArgument("fixed buffers must not be empty"));
        }
        slots.fill_with(|| None);
        Ok(Self { slots, len: 0 })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        self.try_push(value).map_err(|_| Error::CapacityExceeded {
            capacity: self.capacity(),
        })
    }

    pub(crate) fn try_push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.slots[self.len] = Some(value);
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        self.slots[self.len].take()
    }

    /// Insert at `index`, shifting later elements right.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        if index > self.len {
            return Err(Error::InvalidArgument("index out of range"));
        }
        if self.is_full() {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        self.slots[index..=self.len].rotate_right(1);
        self.slots[index] = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Remove the element at `index`, shifting later elements left.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(Error::InvalidArgument("index out of range"));
        }
        let value = self.slots[index].take();
        self.slots[index..self.len].rotate_left(1);
        self.len -= 1;
        value.ok_or(Error::InvalidArgument("index out of range"))
    }

    /// Remove the first element equal to `value`.
    pub fn remove(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self.index_of(value) {
            Some(i) => self.remove_at(i).is_ok(),
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots[..self.len].get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots[..self.len].get_mut(index)?.as_mut()
    }

    /// Overwrite the element at `index`, returning the old one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        self.get_mut(index)
            .map(|slot| core::mem::replace(slot, value))
            .ok_or(Error::InvalidArgument("index out of range"))
    }

    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|v| v == value)
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.index_of(value).is_some()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots[..self.len] {
            *slot = None;
        }
        self.len = 0;
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.slots[..self.len].iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> {
        self.slots[..self.len].iter_mut().flatten()
    }

    /// Move every element out in order, leaving the list empty. Elements
    /// not consumed before the iterator is dropped are dropped with it.
    pub fn drain(&mut self) -> Drain<'_, T> {
        let len = core::mem::take(&mut self.len);
        Drain {
            inner: self.slots[..len].iter_mut(),
        }
    }
}

/// Draining iterator returned by [`FixedList::drain`].
pub struct Drain<'l, T> {
    inner: core::slice::IterMut<'l, Option<T>>,
}

impl<'l, T> Iterator for Drain<'l, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.by_ref().find_map(Option::take)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.inner.len()))
    }
}

impl<'l, T> Drop for Drain<'l, T> {
    fn drop(&mut self) {
        for slot in self.inner.by_ref() {
            *slot = None;
        }
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for FixedList<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
