//! The dense four-axis [`Grid`] and its [`CellIndex`] addressing.

use std::ops::{Index, IndexMut};

use phz_core::{DeepClone, IndexError};

use crate::axis::{AxesTuple, Axis, ModelParameter};
use crate::slice::{Slice, SliceIter, SliceIterMut, SliceMut};

/// Address of one grid cell: one knot index per axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellIndex {
    /// Redshift knot index.
    pub z: usize,
    /// E(B-V) knot index.
    pub ebv: usize,
    /// Reddening-curve index.
    pub reddening_curve: usize,
    /// SED index.
    pub sed: usize,
}

impl CellIndex {
    /// Build an index from its four components, in axis order.
    pub fn new(z: usize, ebv: usize, reddening_curve: usize, sed: usize) -> Self {
        Self {
            z,
            ebv,
            reddening_curve,
            sed,
        }
    }

    /// The component along `param`.
    pub fn get(&self, param: ModelParameter) -> usize {
        match param {
            ModelParameter::Z => self.z,
            ModelParameter::Ebv => self.ebv,
            ModelParameter::ReddeningCurve => self.reddening_curve,
            ModelParameter::Sed => self.sed,
        }
    }

    /// The component along axis `A`.
    pub fn axis<A: Axis>(&self) -> usize {
        self.get(A::PARAM)
    }

    pub(crate) fn from_array(a: [usize; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }

    pub(crate) fn to_array(self) -> [usize; 4] {
        [self.z, self.ebv, self.reddening_curve, self.sed]
    }
}

impl DeepClone for CellIndex {
    fn deep_clone(&self) -> Self {
        *self
    }
}

/// A dense array holding one `T` per combination of axis knots.
///
/// Cells are stored with the redshift index varying fastest, then E(B-V),
/// reddening curve and SED: column-major with respect to the axis order
/// `(Z, E(B-V), reddening curve, SED)`, so the flat offset of
/// `(z, e, r, s)` is `z + nz * (e + ne * (r + nr * s))`. The cell count is
/// always the product of the axis sizes; grids never resize.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    axes: AxesTuple,
    cells: Vec<T>,
}

/// Grid of real values (log-probabilities, scale factors, ...).
pub type DoubleGrid = Grid<f64>;

/// Grid holding a list of values per cell (scale-factor samples).
pub type DoubleListGrid = Grid<Vec<f64>>;

impl<T: Default> Grid<T> {
    /// Allocate a grid with every cell set to `T::default()`.
    pub fn new(axes: AxesTuple) -> Self {
        let cells = (0..axes.cell_count()).map(|_| T::default()).collect();
        Self { axes, cells }
    }
}

impl<T> Grid<T> {
    /// Build a grid by evaluating `f` at every cell, in walk order.
    pub fn from_fn(axes: AxesTuple, mut f: impl FnMut(CellIndex) -> T) -> Self {
        let count = axes.cell_count();
        let shape = axes.shape();
        let cells = (0..count).map(|offset| f(unflatten(shape, offset))).collect();
        Self { axes, cells }
    }

    /// Wrap existing cell storage laid out in walk order.
    pub fn from_vec(axes: AxesTuple, cells: Vec<T>) -> Result<Self, IndexError> {
        let expected = axes.cell_count();
        if cells.len() != expected {
            return Err(IndexError::IncompatibleAxes {
                reason: format!("{} cells given for a grid of {expected} cells", cells.len()),
            });
        }
        Ok(Self { axes, cells })
    }

    /// The axes of this grid.
    pub fn axes(&self) -> &AxesTuple {
        &self.axes
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false for a grid built from valid axes.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat offset of `index`.
    pub fn offset_of(&self, index: CellIndex) -> Result<usize, IndexError> {
        let shape = self.axes.shape();
        let parts = index.to_array();
        for (param, (&i, &len)) in ModelParameter::ALL.iter().zip(parts.iter().zip(&shape)) {
            if i >= len {
                return Err(IndexError::OutOfRange {
                    axis: param.name(),
                    index: i,
                    len,
                });
            }
        }
        Ok(flatten(shape, parts))
    }

    /// Cell index of flat `offset`.
    pub fn index_of(&self, offset: usize) -> Result<CellIndex, IndexError> {
        if offset >= self.cells.len() {
            return Err(IndexError::OutOfRange {
                axis: "flat offset",
                index: offset,
                len: self.cells.len(),
            });
        }
        Ok(unflatten(self.axes.shape(), offset))
    }

    /// The cell at `index`.
    pub fn get(&self, index: CellIndex) -> Result<&T, IndexError> {
        let offset = self.offset_of(index)?;
        Ok(&self.cells[offset])
    }

    /// Mutable access to the cell at `index`.
    pub fn get_mut(&mut self, index: CellIndex) -> Result<&mut T, IndexError> {
        let offset = self.offset_of(index)?;
        Ok(&mut self.cells[offset])
    }

    /// The knot of axis `A` at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the grid.
    pub fn axis_value<A: Axis>(&self, index: CellIndex) -> &A::Value {
        &A::knots(&self.axes)[index.axis::<A>()]
    }

    /// Cells in walk order.
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }

    /// Mutable cells in walk order.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Consume the grid, returning its cells in walk order.
    pub fn into_vec(self) -> Vec<T> {
        self.cells
    }

    /// Walk every cell.
    pub fn iter(&self) -> SliceIter<'_, T> {
        self.slice().into_iter()
    }

    /// Walk every cell mutably.
    pub fn iter_mut(&mut self) -> SliceIterMut<'_, T> {
        self.slice_mut().into_iter()
    }

    /// An unrestricted view, to be narrowed with `fix_index` / `fix_value`.
    pub fn slice(&self) -> Slice<'_, T> {
        Slice::new(self)
    }

    /// An unrestricted mutable view.
    pub fn slice_mut(&mut self) -> SliceMut<'_, T> {
        SliceMut::new(self)
    }

    /// A grid over the same axes with `f` applied to every cell.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            axes: self.axes.clone(),
            cells: self.cells.iter().map(f).collect(),
        }
    }

    /// Whether `other` shares this grid's axes.
    pub fn is_compatible<U>(&self, other: &Grid<U>) -> bool {
        self.axes.is_compatible(other.axes())
    }

    /// Fails with [`IndexError::IncompatibleAxes`] unless `other` shares
    /// this grid's axes. `what` names `other` in the error.
    pub fn check_compatible<U>(&self, other: &Grid<U>, what: &str) -> Result<(), IndexError> {
        if self.is_compatible(other) {
            Ok(())
        } else {
            Err(IndexError::IncompatibleAxes {
                reason: format!(
                    "{what} has shape {:?}, expected {:?}",
                    other.axes().shape(),
                    self.axes.shape()
                ),
            })
        }
    }

    pub(crate) fn cells_mut(&mut self) -> &mut Vec<T> {
        &mut self.cells
    }
}

impl<T> Index<CellIndex> for Grid<T> {
    type Output = T;

    fn index(&self, index: CellIndex) -> &T {
        match self.offset_of(index) {
            Ok(offset) => &self.cells[offset],
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T> IndexMut<CellIndex> for Grid<T> {
    fn index_mut(&mut self, index: CellIndex) -> &mut T {
        match self.offset_of(index) {
            Ok(offset) => &mut self.cells[offset],
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: Clone> DeepClone for Grid<T> {
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

pub(crate) fn strides(shape: [usize; 4]) -> [usize; 4] {
    [
        1,
        shape[0],
        shape[0] * shape[1],
        shape[0] * shape[1] * shape[2],
    ]
}

pub(crate) fn flatten(shape: [usize; 4], index: [usize; 4]) -> usize {
    let s = strides(shape);
    index.iter().zip(s.iter()).map(|(i, s)| i * s).sum()
}

fn unflatten(shape: [usize; 4], mut offset: usize) -> CellIndex {
    let mut parts = [0usize; 4];
    for (part, len) in parts.iter_mut().zip(shape) {
        *part = offset % len;
        offset /= len;
    }
    CellIndex::from_array(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{Ebv, QualifiedName, Sed, Z};
    use proptest::prelude::*;

    fn axes(nz: usize, ne: usize, nr: usize, ns: usize) -> AxesTuple {
        AxesTuple::new(
            (0..nz).map(|i| i as f64 * 0.5).collect(),
            (0..ne).map(|i| i as f64 * 0.1).collect(),
            (0..nr).map(|i| QualifiedName::from(format!("red{i}"))).collect(),
            (0..ns).map(|i| QualifiedName::from(format!("sed{i}"))).collect(),
        )
        .unwrap()
    }

    #[test]
    fn new_is_default_initialized() {
        let g: DoubleGrid = Grid::new(axes(2, 3, 1, 2));
        assert_eq!(g.len(), 12);
        assert!(g.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn redshift_varies_fastest() {
        let g = Grid::from_fn(axes(2, 2, 1, 2), |i| i);
        let order: Vec<CellIndex> = g.as_slice().to_vec();
        assert_eq!(order[0], CellIndex::new(0, 0, 0, 0));
        assert_eq!(order[1], CellIndex::new(1, 0, 0, 0));
        assert_eq!(order[2], CellIndex::new(0, 1, 0, 0));
        assert_eq!(order[4], CellIndex::new(0, 0, 0, 1));
    }

    #[test]
    fn out_of_range_index_fails() {
        let g: DoubleGrid = Grid::new(axes(2, 2, 1, 1));
        match g.get(CellIndex::new(0, 2, 0, 0)) {
            Err(IndexError::OutOfRange {
                axis: "E(B-V)",
                index: 2,
                len: 2,
            }) => {}
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert!(g.index_of(4).is_err());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn indexing_out_of_range_panics() {
        let g: DoubleGrid = Grid::new(axes(1, 1, 1, 1));
        let _ = g[CellIndex::new(1, 0, 0, 0)];
    }

    #[test]
    fn from_vec_checks_size() {
        assert!(Grid::from_vec(axes(2, 1, 1, 1), vec![1.0]).is_err());
        let g = Grid::from_vec(axes(2, 1, 1, 1), vec![1.0, 2.0]).unwrap();
        assert_eq!(g[CellIndex::new(1, 0, 0, 0)], 2.0);
    }

    #[test]
    fn axis_value_reports_knots() {
        let g: DoubleGrid = Grid::new(axes(3, 2, 1, 2));
        let idx = CellIndex::new(2, 1, 0, 1);
        assert_eq!(*g.axis_value::<Z>(idx), 1.0);
        assert_eq!(*g.axis_value::<Ebv>(idx), 0.1);
        assert_eq!(g.axis_value::<Sed>(idx).as_str(), "sed1");
    }

    #[test]
    fn map_preserves_axes() {
        let g = Grid::from_fn(axes(2, 2, 1, 1), |i| i.z as f64);
        let h: Grid<Vec<f64>> = g.map(|v| vec![*v; 2]);
        assert!(g.is_compatible(&h));
        assert_eq!(h[CellIndex::new(1, 1, 0, 0)], vec![1.0, 1.0]);
    }

    #[test]
    fn offsets_are_column_major() {
        let g: DoubleGrid = Grid::new(axes(3, 2, 2, 2));
        assert_eq!(g.offset_of(CellIndex::new(1, 0, 0, 0)).unwrap(), 1);
        assert_eq!(g.offset_of(CellIndex::new(0, 1, 0, 0)).unwrap(), 3);
        assert_eq!(g.offset_of(CellIndex::new(0, 0, 1, 0)).unwrap(), 6);
        assert_eq!(g.offset_of(CellIndex::new(2, 1, 1, 1)).unwrap(), 23);
    }

    #[test]
    fn incompatible_grids_reported() {
        let g: DoubleGrid = Grid::new(axes(2, 1, 1, 1));
        let h: Grid<usize> = Grid::new(axes(1, 1, 1, 1));
        assert!(g.check_compatible(&g.map(|_| 0usize), "copy").is_ok());
        match g.check_compatible(&h, "scale factors") {
            Err(IndexError::IncompatibleAxes { reason }) => {
                assert!(reason.starts_with("scale factors"), "{reason}")
            }
            other => panic!("expected IncompatibleAxes, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn offset_roundtrip(nz in 1usize..5, ne in 1usize..5, nr in 1usize..3, ns in 1usize..4) {
            let g: DoubleGrid = Grid::new(axes(nz, ne, nr, ns));
            prop_assert_eq!(g.len(), nz * ne * nr * ns);
            for offset in 0..g.len() {
                let idx = g.index_of(offset).unwrap();
                prop_assert_eq!(g.offset_of(idx).unwrap(), offset);
            }
        }
    }
}
