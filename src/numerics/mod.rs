extern crate nalgebra as na;

use na::DMatrix;
use crate::Float;

pub mod quaternion;

/**
 * Overwrites both triangles with their mean. Applied after every covariance correction.
 */
pub fn symmetrize(matrix: &mut DMatrix<Float>) -> () {
    assert_eq!(matrix.nrows(), matrix.ncols());
    let n = matrix.nrows();
    for r in 0..n {
        for c in (r+1)..n {
            let mean = 0.5*(matrix[(r,c)] + matrix[(c,r)]);
            matrix[(r,c)] = mean;
            matrix[(c,r)] = mean;
        }
    }
}

pub fn max_asymmetry(matrix: &DMatrix<Float>) -> Float {
    assert_eq!(matrix.nrows(), matrix.ncols());
    (matrix - matrix.transpose()).iter().fold(0.0, |max,v|
        match v.abs() {
            v_abs if v_abs > max => v_abs,
            _ => max
        }
    )
}
