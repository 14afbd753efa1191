pub mod rrt_star;
