pub mod shells;
