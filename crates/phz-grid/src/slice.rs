//! Hyperslice views over a [`Grid`].
//!
//! A view holds a reference to the grid plus, per axis, an optional fixed
//! knot index. Walking a view visits only the cells matching every fixed
//! axis, in the same relative order as a walk over the whole grid.

use std::iter::{Enumerate, FusedIterator};
use std::slice;

use phz_core::IndexError;

use crate::axis::{Axis, AxesTuple};
use crate::grid::{flatten, CellIndex, Grid};

type Fixed = [Option<usize>; 4];

fn fix_index<A: Axis>(axes: &AxesTuple, fixed: &mut Fixed, index: usize) -> Result<(), IndexError> {
    let len = A::knots(axes).len();
    if index >= len {
        return Err(IndexError::OutOfRange {
            axis: A::PARAM.name(),
            index,
            len,
        });
    }
    fixed[A::PARAM.position()] = Some(index);
    Ok(())
}

/// A read-only hyperslice of a grid.
#[derive(Debug)]
pub struct Slice<'a, T> {
    grid: &'a Grid<T>,
    fixed: Fixed,
}

impl<T> Clone for Slice<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slice<'_, T> {}

impl<'a, T> Slice<'a, T> {
    pub(crate) fn new(grid: &'a Grid<T>) -> Self {
        Self {
            grid,
            fixed: [None; 4],
        }
    }

    /// Hold axis `A` at knot `index`.
    pub fn fix_index<A: Axis>(mut self, index: usize) -> Result<Self, IndexError> {
        fix_index::<A>(self.grid.axes(), &mut self.fixed, index)?;
        Ok(self)
    }

    /// Hold axis `A` at the knot exactly equal to `value`.
    pub fn fix_value<A: Axis>(self, value: &A::Value) -> Result<Self, IndexError> {
        let index = self.grid.axes().index_of::<A>(value)?;
        self.fix_index::<A>(index)
    }

    /// Number of cells the view visits.
    pub fn len(&self) -> usize {
        Walker::new(self.grid.axes().shape(), self.fixed).remaining
    }

    /// Whether the view visits no cell.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walk the view.
    pub fn iter(&self) -> SliceIter<'a, T> {
        SliceIter {
            grid: self.grid,
            walker: Walker::new(self.grid.axes().shape(), self.fixed),
        }
    }
}

impl<'a, T> IntoIterator for Slice<'a, T> {
    type Item = (CellIndex, &'a T);
    type IntoIter = SliceIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`Slice`], yielding each cell with its index.
#[derive(Debug)]
pub struct SliceIter<'a, T> {
    grid: &'a Grid<T>,
    walker: Walker,
}

impl<T> Clone for SliceIter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            grid: self.grid,
            walker: self.walker.clone(),
        }
    }
}

impl<'a, T> Iterator for SliceIter<'a, T> {
    type Item = (CellIndex, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let parts = self.walker.next()?;
        let offset = flatten(self.walker.shape, parts);
        Some((CellIndex::from_array(parts), &self.grid.as_slice()[offset]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.walker.remaining, Some(self.walker.remaining))
    }
}

impl<T> ExactSizeIterator for SliceIter<'_, T> {}
impl<T> FusedIterator for SliceIter<'_, T> {}

/// A mutable hyperslice of a grid.
#[derive(Debug)]
pub struct SliceMut<'a, T> {
    grid: &'a mut Grid<T>,
    fixed: Fixed,
}

impl<'a, T> SliceMut<'a, T> {
    pub(crate) fn new(grid: &'a mut Grid<T>) -> Self {
        Self {
            grid,
            fixed: [None; 4],
        }
    }

    /// Hold axis `A` at knot `index`.
    pub fn fix_index<A: Axis>(mut self, index: usize) -> Result<Self, IndexError> {
        fix_index::<A>(self.grid.axes(), &mut self.fixed, index)?;
        Ok(self)
    }

    /// Hold axis `A` at the knot exactly equal to `value`.
    pub fn fix_value<A: Axis>(self, value: &A::Value) -> Result<Self, IndexError> {
        let index = self.grid.axes().index_of::<A>(value)?;
        self.fix_index::<A>(index)
    }

    /// Number of cells the view visits.
    pub fn len(&self) -> usize {
        Walker::new(self.grid.axes().shape(), self.fixed).remaining
    }

    /// Whether the view visits no cell.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set every visited cell to a clone of `value`.
    pub fn fill(self, value: T)
    where
        T: Clone,
    {
        for (_, cell) in self {
            *cell = value.clone();
        }
    }
}

impl<'a, T> IntoIterator for SliceMut<'a, T> {
    type Item = (CellIndex, &'a mut T);
    type IntoIter = SliceIterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        let walker = Walker::new(self.grid.axes().shape(), self.fixed);
        SliceIterMut {
            cells: self.grid.cells_mut().iter_mut().enumerate(),
            walker,
        }
    }
}

/// Mutable iterator over a [`SliceMut`].
#[derive(Debug)]
pub struct SliceIterMut<'a, T> {
    cells: Enumerate<slice::IterMut<'a, T>>,
    walker: Walker,
}

impl<'a, T> Iterator for SliceIterMut<'a, T> {
    type Item = (CellIndex, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        let parts = self.walker.next()?;
        let offset = flatten(self.walker.shape, parts);
        // Walk offsets are strictly increasing, so the target is ahead.
        self.cells
            .find(|(i, _)| *i == offset)
            .map(|(_, cell)| (CellIndex::from_array(parts), cell))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.walker.remaining, Some(self.walker.remaining))
    }
}

impl<T> ExactSizeIterator for SliceIterMut<'_, T> {}
impl<T> FusedIterator for SliceIterMut<'_, T> {}

/// Odometer over the free axes, lowest axis fastest.
#[derive(Clone, Debug)]
struct Walker {
    shape: [usize; 4],
    fixed: Fixed,
    current: Option<[usize; 4]>,
    remaining: usize,
}

impl Walker {
    fn new(shape: [usize; 4], fixed: Fixed) -> Self {
        let start = [0, 1, 2, 3].map(|a| fixed[a].unwrap_or(0));
        let remaining = (0..4)
            .filter(|&a| fixed[a].is_none())
            .map(|a| shape[a])
            .product();
        Self {
            shape,
            fixed,
            current: if remaining > 0 { Some(start) } else { None },
            remaining,
        }
    }

    fn next(&mut self) -> Option<[usize; 4]> {
        let current = self.current?;
        self.remaining -= 1;
        let mut next = current;
        let mut advanced = false;
        for axis in 0..4 {
            if self.fixed[axis].is_some() {
                continue;
            }
            if next[axis] + 1 < self.shape[axis] {
                next[axis] += 1;
                advanced = true;
                break;
            }
            next[axis] = 0;
        }
        self.current = if advanced { Some(next) } else { None };
        Some(current)
    }
}
