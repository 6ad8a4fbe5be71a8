pub mod distance;
pub mod normalization;
