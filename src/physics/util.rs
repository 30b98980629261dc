pub mod fastmath;
