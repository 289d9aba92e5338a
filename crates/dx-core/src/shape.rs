//! Shape utilities: numpy-style broadcasting over `ArrayD<f64>`.
//!
//! All distribution parameters and samples are dynamic-rank arrays. Binary
//! and ternary element-wise kernels go through [`map2`] / [`map3`], which
//! broadcast their inputs to a common shape first and fail with
//! [`Error::Shape`] when the shapes are incompatible.

use ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis, IxDyn, Zip};

use crate::{Error, Result};

/// Broadcast two shapes (trailing-aligned, size-1 dimensions stretch).
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let n = a.len().max(b.len());
    let mut out = vec![0usize; n];
    for i in 0..n {
        // Walk from the innermost dimension outwards.
        let da = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let db = if i < b.len() { b[b.len() - 1 - i] } else { 1 };
        out[n - 1 - i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(Error::Shape(format!(
                    "incompatible shapes for broadcasting: {:?} and {:?}",
                    a, b
                )));
            }
        };
    }
    Ok(out)
}

/// Broadcast any number of shapes together. The empty set broadcasts to `[]`.
pub fn broadcast_all<'a, I>(shapes: I) -> Result<Vec<usize>>
where
    I: IntoIterator<Item = &'a [usize]>,
{
    shapes.into_iter().try_fold(Vec::new(), |acc, s| broadcast_shapes(&acc, s))
}

/// View `a` broadcast to `shape`.
pub fn broadcast_view<'a>(a: &'a ArrayD<f64>, shape: &[usize]) -> Result<ArrayViewD<'a, f64>> {
    a.broadcast(IxDyn(shape)).ok_or_else(|| {
        Error::Shape(format!("cannot broadcast shape {:?} to {:?}", a.shape(), shape))
    })
}

/// Materialize `a` broadcast to `shape`.
pub fn broadcast_to(a: &ArrayD<f64>, shape: &[usize]) -> Result<ArrayD<f64>> {
    Ok(broadcast_view(a, shape)?.to_owned())
}

/// Element-wise `f(a, b)` over the broadcast of `a` and `b`.
pub fn map2<F>(a: &ArrayD<f64>, b: &ArrayD<f64>, f: F) -> Result<ArrayD<f64>>
where
    F: Fn(f64, f64) -> f64,
{
    let shape = broadcast_shapes(a.shape(), b.shape())?;
    let va = broadcast_view(a, &shape)?;
    let vb = broadcast_view(b, &shape)?;
    Ok(Zip::from(&va).and(&vb).map_collect(|&x, &y| f(x, y)))
}

/// Element-wise `f(a, b, c)` over the broadcast of all three inputs.
pub fn map3<F>(a: &ArrayD<f64>, b: &ArrayD<f64>, c: &ArrayD<f64>, f: F) -> Result<ArrayD<f64>>
where
    F: Fn(f64, f64, f64) -> f64,
{
    let shape = broadcast_all([a.shape(), b.shape(), c.shape()])?;
    let va = broadcast_view(a, &shape)?;
    let vb = broadcast_view(b, &shape)?;
    let vc = broadcast_view(c, &shape)?;
    Ok(Zip::from(&va).and(&vb).and(&vc).map_collect(|&x, &y, &z| f(x, y, z)))
}

/// Sum over the trailing `n` axes.
pub fn sum_trailing(a: ArrayD<f64>, n: usize) -> Result<ArrayD<f64>> {
    if n > a.ndim() {
        return Err(Error::Shape(format!(
            "cannot reduce {} trailing axes of an array of rank {}",
            n,
            a.ndim()
        )));
    }
    let mut out = a;
    for _ in 0..n {
        let last = out.ndim() - 1;
        out = out.sum_axis(Axis(last));
    }
    Ok(out)
}

/// Apply `f` to every lane along the last axis.
///
/// `f` receives the input lane and a zeroed output lane of length `out_len`;
/// the result has shape `a.shape()[..-1] + [out_len]`.
pub fn map_last_axis<F>(a: &ArrayD<f64>, out_len: usize, mut f: F) -> Result<ArrayD<f64>>
where
    F: FnMut(ArrayView1<'_, f64>, &mut [f64]),
{
    if a.ndim() == 0 {
        return Err(Error::Shape("expected an array of rank >= 1, got a scalar".into()));
    }
    let last = Axis(a.ndim() - 1);
    let mut data = Vec::with_capacity(num_elements(&a.shape()[..a.ndim() - 1]) * out_len);
    let mut buf = vec![0.0; out_len];
    for lane in a.lanes(last) {
        buf.iter_mut().for_each(|v| *v = 0.0);
        f(lane, &mut buf);
        data.extend_from_slice(&buf);
    }
    let mut shape = a.shape()[..a.ndim() - 1].to_vec();
    shape.push(out_len);
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), data)?)
}

/// Reduce every lane along the last axis to a single value.
pub fn reduce_last_axis<F>(a: &ArrayD<f64>, f: F) -> Result<ArrayD<f64>>
where
    F: FnMut(ArrayView1<'_, f64>) -> f64,
{
    if a.ndim() == 0 {
        return Err(Error::Shape("expected an array of rank >= 1, got a scalar".into()));
    }
    Ok(a.map_axis(Axis(a.ndim() - 1), f))
}

/// Split `shape` into `(outer, event)` where `event` has `event_ndims` dims.
pub fn split_event(shape: &[usize], event_ndims: usize) -> Result<(&[usize], &[usize])> {
    if event_ndims > shape.len() {
        return Err(Error::Shape(format!(
            "shape {:?} has rank {} but {} event dimensions were requested",
            shape,
            shape.len(),
            event_ndims
        )));
    }
    Ok(shape.split_at(shape.len() - event_ndims))
}

/// `sample_shape + batch_shape + event_shape`.
pub fn concat_shapes(parts: &[&[usize]]) -> Vec<usize> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

/// Number of elements of an array with the given shape.
pub fn num_elements(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Rank-0 array holding `v`.
pub fn scalar(v: f64) -> ArrayD<f64> {
    ArrayD::from_elem(IxDyn(&[]), v)
}
