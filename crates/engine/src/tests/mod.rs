mod helpers;
mod write_tests;
mod read_tests;
mod batch_tests;

pub(crate) use helpers::open_with;
