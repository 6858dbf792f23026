//! Out-of-order pipeline tests.



/// Rename and dispatch admission.
pub mod rename;



/// Memory serialization dependencies.
pub mod serialize;
