pub mod bs_analytic;
pub mod moment_matching;
