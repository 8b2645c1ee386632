pub mod esm2;
