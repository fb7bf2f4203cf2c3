/// Use mimalloc as the global allocator for the library and the binary.
/// The codec allocates one output buffer per call; the CLI allocates
/// multi-megabyte stream buffers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod common;
pub mod z85;
