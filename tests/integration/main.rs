mod batch;
mod mirror;
