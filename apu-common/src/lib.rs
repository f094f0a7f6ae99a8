//! Small set of bit-level helpers shared by the SPC700 core and the APU device.
//!
//! Mirrors the subset of `jgenesis-common` that the SNES backend leans on for
//! register-file plumbing: bit extraction, sign testing, and split/join of a
//! 16-bit value into its component bytes.

pub mod num;
