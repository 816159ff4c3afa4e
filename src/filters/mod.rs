//! Native filter kernels. Each works on a row-major flattened buffer and a
//! [`Grid`](grid::Grid) describing its shape and spacing; the executor
//! handles element types and output layout.

pub mod canny;
pub mod diffusion;
pub mod distance;
pub mod gaussian;
pub mod grid;
pub mod hessian;
pub mod hole_fill;
pub mod median;
pub mod morphology;
pub mod mrf;
pub mod thinning;
