pub mod frame;
pub mod runtime_error;
pub mod vm_bc;
