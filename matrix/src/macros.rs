/// Matrix literal: rows separated by `;`, elements by `,`.
///
/// ```
/// use matrix::{Matrix, matrix};
///
/// let m = matrix![
///     1.0, 2.0;
///     3.0, 4.0
/// ];
/// assert_eq!(m.shape(), (2, 2));
/// ```
#[macro_export]
macro_rules! matrix {
    ( $( $($val:expr),+ );* $(;)? ) => {
        {
            let rows: Vec<Vec<f64>> = vec![$(vec![$($val),+]),*];
            match $crate::Matrix::from_rows(&rows) {
                Some(matrix) => matrix,
                None => panic!("Inconsistent number of elements in the matrix rows"),
            }
        }
    };
}
