//! Loop-nest analysis: shape predicates and the parallelisability seam.

pub mod dependence;
pub mod nest;

pub use dependence::{is_parallelisable, Conflict, DependenceKind, DependencyOracle, SubscriptOracle};
pub use nest::{
    is_outer_loop, is_perfectly_nested, is_perfectly_nested_with, is_simple_loop, is_simple_loop_with,
    loop_nest_variable_names, loop_variable_name, nest_children, nest_depth_count, nest_parent,
    perfect_nest_depth, perfect_nest_depth_with, NestPolicy,
};
